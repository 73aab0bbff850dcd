//! Tally DB - sqlite persistence for the ledger
//!
//! The record store behind the pipeline. Records are pure creates, so the
//! schema is a single append-only table keyed by record id, with the full
//! record serialized into a payload column and the kind/created_at lifted
//! out for filtering.

pub mod migrations;
pub mod repositories;

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use tally_core::config::DatabaseConfig;

pub use repositories::{RepositoryError, SqlLedgerRepository};

pub type DbPool = sqlx::SqlitePool;

/// Open the ledger pool with the configured limits. Each connection is
/// set up for concurrent appenders: WAL journaling, foreign keys on, and
/// the configured busy timeout on a locked database file.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let busy_timeout_ms = config.busy_timeout_ms;
    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                for pragma in [
                    "PRAGMA journal_mode = WAL".to_string(),
                    "PRAGMA foreign_keys = ON".to_string(),
                    format!("PRAGMA busy_timeout = {busy_timeout_ms}"),
                ] {
                    sqlx::query(&pragma).execute(&mut *conn).await?;
                }
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}
