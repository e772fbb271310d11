//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Strata POS                             │
//! │                                                                         │
//! │  Front end                   Rust Backend                               │
//! │  ─────────                   ────────────                               │
//! │                                                                         │
//! │  POST /api/terminals/t1/checkout/payment                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<T>, ApiError>                                       │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Checkout rule? ─── CoreError::InsufficientTender ──┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Database? ──────── DbError::QueryFailed ─────── ApiError ─────►│  │
//! │  │         │                                    (status + JSON)     │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  422 { "code": "PAYMENT_ERROR",                                         │
//! │        "message": "Insufficient payment: tendered 50, due 65.08, ..." } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal details (SQL errors, backend messages) are logged with
//! `tracing::error!` and replaced with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use strata_core::{CoreError, PortError};
use strata_db::DbError;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Held transaction not found: HLD-000123"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Operation not allowed in the current checkout state (409)
    BusinessLogic,

    /// Cart limit reached (422)
    CartError,

    /// Insufficient stock (409)
    InsufficientStock,

    /// Tender rejected (422)
    PaymentError,

    /// A backend refused the change, e.g. points already spent (409)
    Rejected,

    /// Backend unreachable; state unchanged, safe to retry (503)
    ServiceUnavailable,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::BusinessLogic | ErrorCode::InsufficientStock | ErrorCode::Rejected => {
                StatusCode::CONFLICT
            }
            ErrorCode::CartError | ErrorCode::PaymentError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::DuplicateNumber(number) => ApiError::new(
                ErrorCode::Rejected,
                format!("Transaction number {} is already in use", number),
            ),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Conflict(message) => ApiError::new(ErrorCode::Rejected, message),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::InvalidData(e) => {
                tracing::error!("Stored data could not be decoded: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::ServiceUnavailable, "Database busy, try again")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts checkout errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::LineNotFound(_)
            | CoreError::HeldNotFound(_) => ApiError::new(ErrorCode::NotFound, message),

            CoreError::InsufficientStock { .. } => ApiError::new(ErrorCode::InsufficientStock, message),

            CoreError::EmptyCart
            | CoreError::CartNotEmpty
            | CoreError::InvalidTransactionStatus { .. }
            | CoreError::PaymentAlreadyCaptured(_)
            | CoreError::PaymentMissing(_)
            | CoreError::LoyaltyBalanceChanged { .. }
            | CoreError::CompletionPending(_) => ApiError::new(ErrorCode::BusinessLogic, message),

            CoreError::InsufficientTender { .. } => ApiError::new(ErrorCode::PaymentError, message),

            CoreError::CartTooLarge { .. } => ApiError::new(ErrorCode::CartError, message),

            CoreError::QuantityTooLarge { .. } | CoreError::Validation(_) => ApiError::validation(message),

            CoreError::InvalidLoyaltyConfig(e) => {
                tracing::error!("Invalid loyalty configuration: {}", e);
                ApiError::internal("Loyalty is misconfigured")
            }

            CoreError::Collaborator { operation, source } => match source {
                PortError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
                PortError::DuplicateNumber(number) => {
                    tracing::warn!(operation, %number, "Transaction number still taken after renumbering");
                    ApiError::new(ErrorCode::Rejected, format!("{} was rejected", operation))
                }
                PortError::Rejected(detail) => {
                    tracing::warn!(operation, %detail, "Collaborator rejected operation");
                    ApiError::new(ErrorCode::Rejected, format!("{} was rejected", operation))
                }
                PortError::Unavailable(detail) | PortError::TimedOut(detail) => {
                    tracing::error!(operation, %detail, "Collaborator unavailable");
                    ApiError::new(
                        ErrorCode::ServiceUnavailable,
                        format!("{} failed; the transaction is unchanged, try again", operation),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
