//! # Handlers Module
//!
//! HTTP handlers, grouped by the resource they serve.
//!
//! ## Available Handlers
//!
//! - [`checkout`] - Per-terminal checkout session (lines, customer, hold, payment, complete)
//! - [`transactions`] - Completed transactions and receipt reprints
//! - [`health`] - Liveness and database check

pub mod checkout;
pub mod health;
pub mod transactions;
