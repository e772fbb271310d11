//! # Collaborator Ports
//!
//! Traits through which the checkout reaches everything outside this crate.
//!
//! ```text
//! ┌──────────────────┐         ┌──────────────────────────────────────┐
//! │   strata-core    │         │  strata-db (SQLite)  /  test fakes   │
//! │                  │         │                                      │
//! │  Checkout ───────┼── dyn ─►│  ProductCatalog     find_variant     │
//! │                  │         │  CustomerDirectory  find_customer    │
//! │                  │         │  TransactionStore   save             │
//! │                  │         │  LoyaltyLedger      commit_points    │
//! └──────────────────┘         └──────────────────────────────────────┘
//! ```
//!
//! Every method reports failure as [`PortError`]. A timeout is not a success:
//! implementations that cannot confirm an outcome return `TimedOut`.
//!
//! `save` and `commit_points` must be idempotent per `transaction_number`,
//! which is what makes retrying a failed completion safe.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::PortError;
use crate::types::{CatalogItem, CatalogLookup, Customer, TransactionRecord};

/// Product/stock catalog: lookup by id, SKU or barcode.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_variant(&self, lookup: &CatalogLookup) -> Result<Option<CatalogItem>, PortError>;
}

/// Customer records with their loyalty balance.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, PortError>;
}

/// Point movements committed for one completed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyCommit {
    pub customer_id: String,
    pub transaction_number: String,
    pub points_redeemed: i64,
    pub points_earned: i64,
}

/// Loyalty balance updates.
#[async_trait]
pub trait LoyaltyLedger: Send + Sync {
    /// Debits redeemed and credits earned points in one step.
    ///
    /// Returns the new balance. Committing the same `transaction_number`
    /// twice must not move the balance twice.
    async fn commit_points(&self, commit: &LoyaltyCommit) -> Result<i64, PortError>;
}

/// Identity assigned by the store to a saved transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SavedTransaction {
    pub transaction_id: String,
    pub transaction_number: String,
}

/// Durable transaction persistence.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persists a completed record.
    ///
    /// Saving a `transaction_number` that already exists returns the existing
    /// identity without writing again.
    async fn save(&self, record: &TransactionRecord) -> Result<SavedTransaction, PortError>;
}
