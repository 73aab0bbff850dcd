//! Tally Core - domain model for the command pipeline
//!
//! Shared types for the natural-language bookkeeping assistant:
//! commands and intents, ledger records with provenance, the append-only
//! session transcript, the compounding levy schedule, configuration, and
//! the ledger store port the executors write through.

pub mod config;
pub mod domain;
pub mod levy;
pub mod store;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::command::{Command, Intent, WALK_IN_CUSTOMER};
pub use domain::record::{
    CustomerRecord, ExpenseRecord, InventoryRecord, LedgerRecord, Provenance, RecordId,
    RecordKind, SaleRecord,
};
pub use domain::transcript::{Message, MessageId, MessageRole, SessionTranscript};
pub use levy::{LevyBreakdown, LevyComponent, LevyRate, LevySchedule};
pub use store::{InMemoryLedgerStore, LedgerStore, StoreError};
