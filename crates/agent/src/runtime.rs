//! Session runtime: one submission at a time, in order.
//!
//! The transcript and pipeline sit behind one async mutex, so a submission
//! arriving while another is in flight queues behind it instead of
//! interleaving. A queued submission never cancels an in-flight retry
//! loop; it simply waits its turn.

use std::sync::Arc;

use tally_core::{Intent, Message, SessionTranscript};
use tokio::sync::Mutex;

use crate::attachments::{confirmation_prompt, AttachmentRef, AttachmentService};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::interpreter::CommandInterpreter;

const DEGRADED_NOTE: &str =
    "Heads up: the smart assistant is unreachable, so I matched your request with basic rules.";

#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionResult {
    pub outcome: DispatchOutcome,
    /// The message appended last for this submission, for immediate display.
    pub reply: Message,
}

pub struct AgentRuntime {
    interpreter: CommandInterpreter,
    dispatcher: Dispatcher,
    attachments: Arc<dyn AttachmentService>,
    session: Mutex<SessionTranscript>,
}

impl AgentRuntime {
    pub fn new(
        interpreter: CommandInterpreter,
        dispatcher: Dispatcher,
        attachments: Arc<dyn AttachmentService>,
    ) -> Self {
        Self { interpreter, dispatcher, attachments, session: Mutex::new(SessionTranscript::new()) }
    }

    /// Interpret and dispatch one operator submission.
    pub async fn handle_submission(&self, text: &str) -> SubmissionResult {
        let mut transcript = self.session.lock().await;
        transcript.push_user(text);

        let interpretation = self.interpreter.interpret(text).await;
        if interpretation.is_degraded() && interpretation.command.intent != Intent::Conversation {
            // Conversational fallback replies disclose degraded mode on
            // their own; business commands get an explicit note.
            transcript.push_system(DEGRADED_NOTE);
        }

        let outcome = self.dispatcher.dispatch(&interpretation.command, &mut transcript).await;
        let reply = transcript.last().expect("dispatch always appends").clone();
        SubmissionResult { outcome, reply }
    }

    /// Surface attachment suggestions as a clarification; never dispatches.
    pub async fn handle_attachment(&self, attachment: AttachmentRef) -> Message {
        let mut transcript = self.session.lock().await;

        let text = match self.attachments.extract(&attachment).await {
            Ok(fields) => confirmation_prompt(&attachment, &fields),
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.attachment.extract_failed",
                    file_name = %attachment.file_name,
                    error = %error,
                    "attachment extraction failed"
                );
                format!(
                    "I couldn't process {} ({error}). Please type the entry as a command instead.",
                    attachment.file_name
                )
            }
        };
        transcript.push_system(text).clone()
    }

    /// Ordered copy of the session log for display consumers.
    pub async fn transcript_snapshot(&self) -> Vec<Message> {
        self.session.lock().await.messages().to_vec()
    }
}
