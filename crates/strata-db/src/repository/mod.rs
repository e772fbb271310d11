//! # Repository Module
//!
//! SQLite repositories behind the checkout's collaborator ports.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ports and their SQLite side                          │
//! │                                                                         │
//! │  Checkout (strata-core)                                                 │
//! │       │                                                                 │
//! │       │  store.save(&record)        ledger.commit_points(&commit)       │
//! │       │  catalog.find_variant(..)   directory.find_customer(id)         │
//! │       ▼                                                                 │
//! │  TransactionRepository   CustomerRepository   CatalogRepository         │
//! │  ├── save_completed      ├── get_by_id        ├── find                  │
//! │  ├── get_by_number       ├── commit_points    ├── insert                │
//! │  └── list_recent         └── history          └── stock_level           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TransactionRepository`](transaction::TransactionRepository) - Completed sales
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and loyalty points
//! - [`CatalogRepository`](catalog::CatalogRepository) - Variants and stock

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

pub mod catalog;
pub mod customer;
pub mod transaction;

/// Parses a TEXT decimal column.
pub(crate) fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| DbError::InvalidData(format!("{} = '{}': {}", column, value, e)))
}
