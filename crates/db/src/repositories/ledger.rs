use async_trait::async_trait;
use sqlx::Row;

use tally_core::store::{LedgerStore, StoreError};
use tally_core::{LedgerRecord, RecordId, RecordKind};

use super::RepositoryError;
use crate::DbPool;

/// Sqlite-backed ledger store. One row per record; the INSERT is the
/// atomic append the pipeline relies on.
pub struct SqlLedgerRepository {
    pool: DbPool,
}

impl SqlLedgerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &LedgerRecord) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(record)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO ledger_record (id, kind, provenance, payload, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(record.id().0.to_string())
        .bind(record.kind().as_str())
        .bind(record.provenance().as_str())
        .bind(payload)
        .bind(record.created_at().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select(&self, filter: Option<RecordKind>) -> Result<Vec<LedgerRecord>, RepositoryError> {
        let rows = match filter {
            Some(kind) => {
                sqlx::query(
                    "SELECT payload FROM ledger_record WHERE kind = ?1 ORDER BY created_at, id",
                )
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT payload FROM ledger_record ORDER BY created_at, id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter()
            .map(|row| {
                let payload: String = row.get("payload");
                serde_json::from_str(&payload)
                    .map_err(|error| RepositoryError::Decode(error.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl LedgerStore for SqlLedgerRepository {
    async fn append(&self, record: LedgerRecord) -> Result<RecordId, StoreError> {
        let id = record.id();
        self.insert(&record).await.map_err(store_error)?;
        Ok(id)
    }

    async fn list(&self, filter: Option<RecordKind>) -> Result<Vec<LedgerRecord>, StoreError> {
        self.select(filter).await.map_err(store_error)
    }
}

fn store_error(error: RepositoryError) -> StoreError {
    match error {
        RepositoryError::Database(database) => StoreError::Unavailable(database.to_string()),
        RepositoryError::Decode(message) => StoreError::Encode(message),
    }
}
