//! # Error Types
//!
//! Domain-specific error types for strata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  strata-core errors (this file)                                        │
//! │  ├── CoreError        - Checkout rule violations                       │
//! │  ├── ValidationError  - Operator input failures                        │
//! │  └── PortError        - Collaborator (store, catalog, ledger) failures │
//! │                                                                         │
//! │  strata-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures → PortError        │
//! │                                                                         │
//! │  strata-api errors (in app)                                            │
//! │  └── ApiError         - What the front end sees (serialized)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant renders a short message an operator can act on.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Checkout engine errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product variant cannot be found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer cannot be found in the customer store.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Not enough stock on hand for the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan SHIRT-M-BLU (qty in cart: 2, adding 1)
    ///      │
    ///      ▼
    /// Check stock: on hand = 2
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "SHIRT-M-BLU", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// UI shows: "Insufficient stock for SHIRT-M-BLU: available 2, requested 3"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Line id is not in the cart (update only; removal of an unknown id is a no-op).
    #[error("Line not found in cart: {0}")]
    LineNotFound(String),

    /// Hold, payment and completion all need at least one line.
    #[error("Cart is empty")]
    EmptyCart,

    /// A new transaction cannot be retrieved over one that has lines.
    #[error("Current transaction has items; hold or finish it first")]
    CartNotEmpty,

    /// Transaction is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Mutating a voided transaction before it is acknowledged
    /// - Any operation reaching a completed transaction
    #[error("Transaction {transaction_number} is {status}, cannot {operation}")]
    InvalidTransactionStatus {
        transaction_number: String,
        status: TransactionStatus,
        operation: &'static str,
    },

    /// Cart edits and a second capture are blocked once payment is attached.
    #[error("Payment already captured for transaction {0}")]
    PaymentAlreadyCaptured(String),

    /// Completion needs a captured payment.
    #[error("No payment captured for transaction {0}")]
    PaymentMissing(String),

    /// The customer's live point balance no longer covers the redemption.
    ///
    /// ## User Workflow
    /// ```text
    /// Lane 2 attaches Ada (500 pts), redeems, takes 60.08 cash
    ///      │
    ///      ▼
    /// Lane 1 completes first and spends 440 of Ada's points
    ///      │
    ///      ▼
    /// Lane 2 completes: balance re-read (60), redemption re-clamped,
    /// amount due rises to 64.48 > 60.08 tendered
    ///      │
    ///      ▼
    /// Payment detached, nothing saved, operator takes payment again
    /// ```
    #[error("Loyalty balance changed for transaction {transaction_number}; amount due is now {amount_due}, capture payment again")]
    LoyaltyBalanceChanged {
        transaction_number: String,
        amount_due: Decimal,
    },

    /// Loyalty points for this transaction are already committed; only
    /// completing it is allowed.
    #[error("Transaction {0} has committed loyalty points; complete it to finish")]
    CompletionPending(String),

    /// Tendered amount is below the amount due.
    #[error("Insufficient payment: tendered {tendered}, due {due}, short by {shortfall}")]
    InsufficientTender {
        tendered: Decimal,
        due: Decimal,
        shortfall: Decimal,
    },

    /// No held transaction under this park code (or it was already retrieved).
    #[error("Held transaction not found: {0}")]
    HeldNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Loyalty configuration values are unusable.
    #[error("Invalid loyalty configuration: {0}")]
    InvalidLoyaltyConfig(String),

    /// A collaborator call (save, lookup, point commit) did not succeed.
    ///
    /// In-memory checkout state is left untouched so the operator can retry.
    #[error("{operation} failed: {source}")]
    Collaborator {
        operation: &'static str,
        #[source]
        source: PortError,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Wraps a collaborator failure with the operation that hit it.
    pub fn collaborator(operation: &'static str, source: PortError) -> Self {
        CoreError::Collaborator { operation, source }
    }

    /// True when retrying the same operation can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Collaborator {
                source: PortError::Unavailable(_) | PortError::TimedOut(_),
                ..
            }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any checkout state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., unparseable amount, malformed park code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Port Error
// =============================================================================

/// Failure reported by an external collaborator.
///
/// `Unavailable` and `TimedOut` are both non-success; the checkout treats them
/// the same way and keeps its state for a retry.
#[derive(Debug, Clone, Error)]
pub enum PortError {
    /// Backend could not be reached or failed mid-operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Outcome unknown; the transport gave up waiting.
    #[error("timed out: {0}")]
    TimedOut(String),

    /// Referenced entity does not exist on the collaborator side.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Collaborator refused the request (constraint violation, bad data).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The transaction number is already recorded for a different sale.
    ///
    /// Nothing was written; the checkout stamps a new number and tries again.
    #[error("transaction number {0} already belongs to a different sale")]
    DuplicateNumber(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
