//! # strata-core: Checkout Engine for Strata POS
//!
//! All checkout business logic, with zero I/O. Persistence, catalog and
//! loyalty balances are reached through the traits in [`ports`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Strata POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser front end                            │   │
//! │  │    Scan ──► Cart ──► Hold / Void ──► Tender ──► Receipt         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    strata-api (axum)                            │   │
//! │  │    one Checkout per terminal, shared HeldStore                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ strata-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   money ─► totals ─► loyalty ─► cart ─► checkout ─► receipt     │   │
//! │  │                                  held ──┘   │                   │   │
//! │  │                                      ports ◄┘                   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │ implements ports                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    strata-db (SQLite)                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CartLine, TransactionRecord, Payment, ...)
//! - [`money`] - `Money` (cents) and the single rounding rule
//! - [`totals`] - Subtotal, discount, per-rate tax, grand total
//! - [`loyalty`] - Point redemption and earning
//! - [`cart`] - Line list with always-current totals
//! - [`held`] - Shared store of parked transactions
//! - [`checkout`] - Transaction lifecycle for one terminal
//! - [`receipt`] - Receipt document projection and text rendering
//! - [`ports`] - Collaborator traits
//! - [`validation`] - Operator input rules
//! - [`error`] - Error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use strata_core::{Checkout, HeldStore, NewLine, Percent, PaymentMethod};
//!
//! let mut checkout = Checkout::new(HeldStore::new(), None);
//! checkout.add_line(NewLine {
//!     product_id: "p-shirt".into(),
//!     variant_id: "v-shirt-m-blue".into(),
//!     name: "Shirt".into(),
//!     size: Some("M".into()),
//!     color: Some("Blue".into()),
//!     quantity: Some(2),
//!     unit_price: Decimal::new(2999, 2),
//!     discount_percent: Percent::zero(),
//!     tax_percent: Percent::new(Decimal::new(85, 1)),
//!     category_id: None,
//! }).unwrap();
//!
//! assert_eq!(checkout.cart().amount_due().cents(), 6508);
//!
//! let payment = checkout.capture_payment(PaymentMethod::Cash, "70.00").unwrap();
//! assert_eq!(payment.change_due.cents(), 492);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod held;
pub mod loyalty;
pub mod money;
pub mod ports;
pub mod receipt;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::Cart;
pub use checkout::{Checkout, CheckoutSnapshot, CompletedSale, VoidRecord};
pub use error::{CoreError, CoreResult, PortError, ValidationError};
pub use held::HeldStore;
pub use loyalty::{apply_loyalty, LoyaltyAdjustment, LoyaltyConfig};
pub use money::Money;
pub use ports::{CustomerDirectory, LoyaltyCommit, LoyaltyLedger, ProductCatalog, SavedTransaction, TransactionStore};
pub use receipt::{ReceiptDocument, StoreConfig};
pub use totals::compute_totals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in one cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity on a single line.
///
/// Catches a fat-fingered 1000 meant as 10.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Highest unit price accepted on a line, in whole currency units.
pub const MAX_UNIT_PRICE: i64 = 999_999;

/// Highest tax rate accepted on a line, in percent.
pub const MAX_TAX_PERCENT: i64 = 100;

/// Maximum length of a hold or void reason.
pub const MAX_REASON_LEN: usize = 200;

/// Prefix of every park code.
pub const PARK_CODE_PREFIX: &str = "HLD-";

/// Random digits after [`PARK_CODE_PREFIX`].
pub const PARK_CODE_DIGITS: usize = 6;
