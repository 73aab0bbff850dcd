use std::collections::HashSet;

use sqlx::migrate::{Migrate, MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the ledger schema up to date, returning how many migrations were
/// newly applied.
pub async fn run_pending(pool: &DbPool) -> Result<usize, MigrateError> {
    let mut conn = pool.acquire().await?;
    conn.ensure_migrations_table().await?;
    let already_applied: HashSet<i64> = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|migration| migration.version)
        .collect();
    drop(conn);

    MIGRATOR.run(pool).await?;

    Ok(MIGRATOR
        .iter()
        .filter(|migration| !already_applied.contains(&migration.version))
        .count())
}
