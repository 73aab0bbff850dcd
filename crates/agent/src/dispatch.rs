//! Confidence gate and intent routing.
//!
//! Takes a parsed command and either replies, asks for clarification, or
//! routes to exactly one executor. A command below the confidence threshold
//! never reaches an executor, so it can never create a record.

use std::sync::Arc;

use tally_core::store::LedgerStore;
use tally_core::{Command, Intent, LevySchedule, RecordId, SessionTranscript};

use crate::executors::{
    CustomerExecutor, ExecutorError, ExpenseExecutor, InventoryExecutor, SaleExecutor,
};

/// Commands scoring below this never mutate the ledger.
pub const CONFIDENCE_THRESHOLD: f32 = 0.6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Conversational reply, no mutation.
    Conversation,
    /// Confidence below the threshold; operator asked to rephrase.
    Clarification,
    /// Intent outside the known taxonomy; operator informed, no mutation.
    UnknownIntent,
    /// A validation failure from the routed executor; no mutation.
    Rejected,
    /// Exactly one record appended.
    Recorded { intent: Intent, record_id: RecordId },
}

pub struct Dispatcher {
    store: Arc<dyn LedgerStore>,
    sale: SaleExecutor,
    expense: ExpenseExecutor,
    customer: CustomerExecutor,
    inventory: InventoryExecutor,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn LedgerStore>, schedule: LevySchedule) -> Self {
        Self {
            store,
            sale: SaleExecutor::new(schedule),
            expense: ExpenseExecutor,
            customer: CustomerExecutor,
            inventory: InventoryExecutor,
        }
    }

    /// Route one command, appending the resulting system or success message.
    pub async fn dispatch(
        &self,
        command: &Command,
        transcript: &mut SessionTranscript,
    ) -> DispatchOutcome {
        if command.intent == Intent::Conversation {
            let reply = command
                .conversational_reply
                .clone()
                .unwrap_or_else(|| "How can I help with your books today?".to_string());
            transcript.push_system(reply);
            return DispatchOutcome::Conversation;
        }

        if command.intent == Intent::Unknown {
            tracing::warn!(
                event_name = "agent.dispatch.unknown_intent",
                "interpreter returned an intent outside the known taxonomy"
            );
            transcript.push_system(
                "I recognized that as a request type this assistant doesn't support yet, \
                 so I haven't recorded anything.",
            );
            return DispatchOutcome::UnknownIntent;
        }

        if command.confidence < CONFIDENCE_THRESHOLD {
            transcript.push_system(clarification_for(command.intent));
            return DispatchOutcome::Clarification;
        }

        let result = match command.intent {
            Intent::Sale => self.sale.execute(command, self.store.as_ref()).await,
            Intent::Expense => self.expense.execute(command, self.store.as_ref()).await,
            Intent::Customer => self.customer.execute(command, self.store.as_ref()).await,
            Intent::Inventory => self.inventory.execute(command, self.store.as_ref()).await,
            Intent::Conversation | Intent::Unknown => unreachable!("handled above"),
        };

        match result {
            Ok(record) => {
                let record_id = record.id();
                tracing::info!(
                    event_name = "agent.dispatch.recorded",
                    intent = %command.intent,
                    record_id = %record_id,
                    "command dispatched into the ledger"
                );
                transcript.push_success(record.summary(), command.intent, record_id);
                DispatchOutcome::Recorded { intent: command.intent, record_id }
            }
            Err(error) => {
                tracing::info!(
                    event_name = "agent.dispatch.rejected",
                    intent = %command.intent,
                    error = %error,
                    "executor rejected the command"
                );
                transcript.push_system(rejection_text(&error));
                DispatchOutcome::Rejected
            }
        }
    }
}

fn clarification_for(intent: Intent) -> String {
    // Hints carry no figures; a clarification must never echo the gated
    // command back at the operator.
    let hint = match intent {
        Intent::Sale => "the sale amount and who it was for",
        Intent::Expense => "the expense amount and what it was for",
        Intent::Customer => "the customer's full name",
        Intent::Inventory => "the item name and how many came in",
        Intent::Conversation | Intent::Unknown => "the amount and details",
    };
    format!(
        "I wasn't sure enough about that to record anything. \
         Could you rephrase with {hint} spelled out?"
    )
}

fn rejection_text(error: &ExecutorError) -> String {
    match error {
        ExecutorError::Store(store_error) => {
            format!("I couldn't reach the ledger, so nothing was recorded ({store_error}).")
        }
        validation => format!("I couldn't record that: {validation}."),
    }
}
