//! # Connection Pool
//!
//! SQLite pool setup and repository access.
//!
//! ## Connection Settings
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  journal_mode = WAL      readers never block the completing terminal   │
//! │  synchronous  = NORMAL   durable across app crashes                     │
//! │  foreign_keys = ON       items/payments must reference a transaction    │
//! │  max 5 connections       several terminals + catalog reads              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::catalog::CatalogRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::transaction::TransactionRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust
/// use strata_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/strata/strata.db")
///     .max_connections(8)
///     .min_connections(2);
/// assert_eq!(config.max_connections, 8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool. Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive. Default: 1
    pub min_connections: u32,

    /// How long to wait for a free connection. Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for a database file (created if missing).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// In-memory database for tests. Each call gets an isolated database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            // One connection: every query must see the same in-memory database
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Database handle providing repository access.
///
/// Cheap to clone; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
                .foreign_keys(true)
        } else {
            let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());
            SqliteConnectOptions::from_str(&connect_url)
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true)
                .create_if_missing(true)
        };

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool created");

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The underlying pool, for queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Completed transactions (implements `TransactionStore`).
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    /// Customers and loyalty balances (implements `CustomerDirectory` and `LoyaltyLedger`).
    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    /// Sellable variants and stock (implements `ProductCatalog`).
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    /// Closes the pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// True when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("CREATE TABLE only_in_a (x INTEGER)")
            .execute(a.pool())
            .await
            .unwrap();
        assert!(sqlx::query("SELECT x FROM only_in_a").execute(b.pool()).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
