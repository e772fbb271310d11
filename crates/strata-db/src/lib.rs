//! # strata-db: Database Layer for Strata POS
//!
//! SQLite persistence for the checkout engine, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Strata POS Data Flow                             │
//! │                                                                         │
//! │  Checkout::complete(&store, &customers, &customers, ..)  (strata-core)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     strata-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ TransactionRepo│    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CustomerRepo   │    │ 001_initial  │  │   │
//! │  │   │               │    │ CatalogRepo    │    │   _schema    │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (STRATA_DB_PATH or the platform data directory)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and their mapping to `PortError`
//! - [`repository`] - Port implementations (transactions, customers, catalog)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strata_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("strata.db")).await?;
//!
//! let store = db.transactions();   // impl TransactionStore
//! let customers = db.customers();  // impl LoyaltyLedger + CustomerDirectory
//! let sale = checkout.complete(&store, &customers, &customers, &store_config).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::customer::{CustomerRepository, LoyaltyHistoryEntry};
pub use repository::transaction::{TransactionListItem, TransactionRepository};
