use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::record::{LedgerRecord, RecordId, RecordKind};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),
    #[error("ledger record could not be encoded: {0}")]
    Encode(String),
}

/// Port for the shared record store.
///
/// The pipeline only ever creates records, so the surface is append/list.
/// `append` must be atomic: the complete record lands or nothing does.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, record: LedgerRecord) -> Result<RecordId, StoreError>;
    async fn list(&self, filter: Option<RecordKind>) -> Result<Vec<LedgerRecord>, StoreError>;
}

/// In-memory store for headless tests and offline chat sessions.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    records: RwLock<Vec<LedgerRecord>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, record: LedgerRecord) -> Result<RecordId, StoreError> {
        let id = record.id();
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))?;
        records.push(record);
        Ok(id)
    }

    async fn list(&self, filter: Option<RecordKind>) -> Result<Vec<LedgerRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))?;
        Ok(records
            .iter()
            .filter(|record| filter.map_or(true, |kind| record.kind() == kind))
            .cloned()
            .collect())
    }
}
