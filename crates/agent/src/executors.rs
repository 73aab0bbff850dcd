//! One executor per business intent.
//!
//! Each executor validates the command's slots, computes derived values,
//! builds the complete record, and appends it to the shared store in a
//! single call. Validation failures happen before any store traffic, so a
//! rejected command never leaves a partial record behind.

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

use tally_core::store::{LedgerStore, StoreError};
use tally_core::{
    Command, CustomerRecord, ExpenseRecord, InventoryRecord, LedgerRecord, LevySchedule,
    Provenance, RecordId, SaleRecord, WALK_IN_CUSTOMER,
};

pub const DEFAULT_PAYMENT_TERMS_DAYS: u32 = 30;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("an amount greater than zero is required")]
    MissingAmount,
    #[error("a description of the expense is required")]
    MissingDescription,
    #[error("a customer name is required")]
    MissingCustomerName,
    #[error("an inventory item name is required")]
    MissingItemName,
    #[error("a quantity greater than zero is required")]
    MissingQuantity,
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn required_amount(command: &Command) -> Result<Decimal, ExecutorError> {
    command
        .amount
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or(ExecutorError::MissingAmount)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

/// Records a sale with the levy breakdown applied in schedule order.
pub struct SaleExecutor {
    schedule: LevySchedule,
}

impl SaleExecutor {
    pub fn new(schedule: LevySchedule) -> Self {
        Self { schedule }
    }

    pub async fn execute(
        &self,
        command: &Command,
        store: &dyn LedgerStore,
    ) -> Result<LedgerRecord, ExecutorError> {
        let amount = required_amount(command)?;
        let customer_name = non_empty(command.counterparty_name.as_deref())
            .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string());
        let breakdown = self.schedule.apply(amount);

        let record = LedgerRecord::Sale(SaleRecord {
            id: RecordId::new(),
            customer_name,
            base_amount: breakdown.base,
            levies: breakdown.components,
            total_amount: breakdown.total,
            provenance: Provenance::MachineGenerated,
            created_at: Utc::now(),
        });
        store.append(record.clone()).await?;
        Ok(record)
    }
}

impl Default for SaleExecutor {
    fn default() -> Self {
        Self::new(LevySchedule::default())
    }
}

#[derive(Debug, Default)]
pub struct ExpenseExecutor;

impl ExpenseExecutor {
    pub async fn execute(
        &self,
        command: &Command,
        store: &dyn LedgerStore,
    ) -> Result<LedgerRecord, ExecutorError> {
        let amount = required_amount(command)?;
        let description = non_empty(command.description.as_deref())
            .ok_or(ExecutorError::MissingDescription)?;
        let category = non_empty(command.category.as_deref())
            .unwrap_or_else(|| crate::fallback::DEFAULT_EXPENSE_CATEGORY.to_string());

        let record = LedgerRecord::Expense(ExpenseRecord {
            id: RecordId::new(),
            amount,
            description,
            category,
            provenance: Provenance::MachineGenerated,
            created_at: Utc::now(),
        });
        store.append(record.clone()).await?;
        Ok(record)
    }
}

#[derive(Debug, Default)]
pub struct CustomerExecutor;

impl CustomerExecutor {
    pub async fn execute(
        &self,
        command: &Command,
        store: &dyn LedgerStore,
    ) -> Result<LedgerRecord, ExecutorError> {
        let name = non_empty(command.counterparty_name.as_deref())
            .ok_or(ExecutorError::MissingCustomerName)?;

        let record = LedgerRecord::Customer(CustomerRecord {
            id: RecordId::new(),
            name,
            credit_limit: Decimal::ZERO,
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
            total_purchases: Decimal::ZERO,
            outstanding_balance: Decimal::ZERO,
            provenance: Provenance::MachineGenerated,
            created_at: Utc::now(),
        });
        store.append(record.clone()).await?;
        Ok(record)
    }
}

/// Creates an inventory record with pricing zeroed pending manual entry.
#[derive(Debug, Default)]
pub struct InventoryExecutor;

impl InventoryExecutor {
    pub async fn execute(
        &self,
        command: &Command,
        store: &dyn LedgerStore,
    ) -> Result<LedgerRecord, ExecutorError> {
        let item_name =
            non_empty(command.description.as_deref()).ok_or(ExecutorError::MissingItemName)?;
        let quantity = command
            .quantity
            .filter(|quantity| *quantity > 0)
            .ok_or(ExecutorError::MissingQuantity)?;

        let record = LedgerRecord::Inventory(InventoryRecord {
            id: RecordId::new(),
            item_name,
            quantity,
            unit_price: Decimal::ZERO,
            total_value: Decimal::ZERO,
            provenance: Provenance::MachineGenerated,
            created_at: Utc::now(),
        });
        store.append(record.clone()).await?;
        Ok(record)
    }
}
