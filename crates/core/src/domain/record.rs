use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::levy::LevyComponent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a record entered the ledger through the command pipeline or a
/// manual entry screen. The pipeline only ever stamps `MachineGenerated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    MachineGenerated,
    Manual,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MachineGenerated => "machine_generated",
            Self::Manual => "manual",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Sale,
    Expense,
    Customer,
    Inventory,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Expense => "expense",
            Self::Customer => "customer",
            Self::Inventory => "inventory",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sale" => Some(Self::Sale),
            "expense" => Some(Self::Expense),
            "customer" => Some(Self::Customer),
            "inventory" => Some(Self::Inventory),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: RecordId,
    pub customer_name: String,
    pub base_amount: Decimal,
    pub levies: Vec<LevyComponent>,
    pub total_amount: Decimal,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: RecordId,
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: RecordId,
    pub name: String,
    pub credit_limit: Decimal,
    pub payment_terms_days: u32,
    pub total_purchases: Decimal,
    pub outstanding_balance: Decimal,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: RecordId,
    pub item_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_value: Decimal,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

/// A persisted business entity, one variant per executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerRecord {
    Sale(SaleRecord),
    Expense(ExpenseRecord),
    Customer(CustomerRecord),
    Inventory(InventoryRecord),
}

impl LedgerRecord {
    pub fn id(&self) -> RecordId {
        match self {
            Self::Sale(record) => record.id,
            Self::Expense(record) => record.id,
            Self::Customer(record) => record.id,
            Self::Inventory(record) => record.id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Sale(_) => RecordKind::Sale,
            Self::Expense(_) => RecordKind::Expense,
            Self::Customer(_) => RecordKind::Customer,
            Self::Inventory(_) => RecordKind::Inventory,
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            Self::Sale(record) => record.provenance,
            Self::Expense(record) => record.provenance,
            Self::Customer(record) => record.provenance,
            Self::Inventory(record) => record.provenance,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Sale(record) => record.created_at,
            Self::Expense(record) => record.created_at,
            Self::Customer(record) => record.created_at,
            Self::Inventory(record) => record.created_at,
        }
    }

    /// One-line confirmation used in success messages.
    pub fn summary(&self) -> String {
        match self {
            Self::Sale(record) => format!(
                "Recorded a sale of {} for {} (total {} including levies).",
                record.base_amount, record.customer_name, record.total_amount
            ),
            Self::Expense(record) => format!(
                "Recorded an expense of {} for {} under {}.",
                record.amount, record.description, record.category
            ),
            Self::Customer(record) => {
                format!("Added customer {} with {}-day payment terms.", record.name, record.payment_terms_days)
            }
            Self::Inventory(record) => format!(
                "Added {} x {} to inventory (pricing pending manual completion).",
                record.quantity, record.item_name
            ),
        }
    }
}
