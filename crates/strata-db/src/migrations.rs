//! # Database Migrations
//!
//! Embedded SQL migrations, compiled into the binary from
//! `migrations/sqlite/` at the workspace root.
//!
//! ## Migration Files
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   catalog, customers, loyalty history,
//!                              transactions, items, payments
//! ```
//!
//! Applied migrations are tracked in `_sqlx_migrations`; running twice is a no-op.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies all pending migrations in order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(available = MIGRATOR.migrations.len(), "Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    // Table is absent until the first run
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_migrations_applied_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (total, applied) = super::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);

        db.run_migrations().await.unwrap();
        let (_, applied_again) = super::migration_status(db.pool()).await.unwrap();
        assert_eq!(applied, applied_again);
    }
}
