//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├──► PortError (strata-core) ← when called through a port        │
//! │       │                                                                 │
//! │       └──► ApiError (strata-api)   ← when a handler queries directly   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use strata_core::PortError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate SKU or barcode
    /// - Duplicate transaction number (concurrent save of the same sale)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A transaction number is already stored for a different sale.
    ///
    /// The caller stamps a new number and tries again.
    #[error("Transaction number {0} already belongs to a different sale")]
    DuplicateNumber(String),

    /// A guarded update matched no row (e.g. not enough loyalty points).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value could not be decoded into its domain type.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use, acquire timed out).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for a UNIQUE failure on `column` (e.g. `"transactions.transaction_number"`).
    pub fn is_unique_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field == column)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::ColumnDecode   → DbError::InvalidData
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite: "UNIQUE constraint failed: <table>.<column>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { index, source } => {
                DbError::InvalidData(format!("column {}: {}", index, source))
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// How the checkout sees a database failure.
///
/// ```text
/// NotFound                         → PortError::NotFound
/// PoolExhausted                    → PortError::TimedOut
/// Connection / Migration / Internal→ PortError::Unavailable
/// DuplicateNumber                  → PortError::DuplicateNumber
/// Unique / FK / Conflict / Invalid → PortError::Rejected
/// QueryFailed                      → PortError::Unavailable
/// ```
impl From<DbError> for PortError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PortError::NotFound { entity, id },
            DbError::PoolExhausted => PortError::TimedOut(err.to_string()),
            DbError::DuplicateNumber(number) => PortError::DuplicateNumber(number),
            DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::Conflict(_)
            | DbError::InvalidData(_) => PortError::Rejected(err.to_string()),
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::Internal(_) => PortError::Unavailable(err.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_mapping() {
        assert!(matches!(
            PortError::from(DbError::not_found("Customer", "c-1")),
            PortError::NotFound { .. }
        ));
        assert!(matches!(PortError::from(DbError::PoolExhausted), PortError::TimedOut(_)));
        assert!(matches!(
            PortError::from(DbError::Conflict("balance".into())),
            PortError::Rejected(_)
        ));
        assert!(matches!(
            PortError::from(DbError::ConnectionFailed("gone".into())),
            PortError::Unavailable(_)
        ));
        assert!(matches!(
            PortError::from(DbError::DuplicateNumber("TXN-1".into())),
            PortError::DuplicateNumber(number) if number == "TXN-1"
        ));
    }

    #[test]
    fn test_is_unique_on() {
        let err = DbError::duplicate("transactions.transaction_number", "TXN-1");
        assert!(err.is_unique_on("transactions.transaction_number"));
        assert!(!err.is_unique_on("product_variants.sku"));
    }
}
