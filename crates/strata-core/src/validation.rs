//! # Validation Module
//!
//! Operator input validation for the checkout engine.
//!
//! ## Where Validation Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end                                                    │
//! │  └── Immediate feedback (empty fields, numeric keypad)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: strata-api handler                                           │
//! │  └── Deserialization (types, required JSON fields)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE, called by Cart / Checkout                       │
//! │  └── Business rules, checked BEFORE any state is touched               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite (CHECK, UNIQUE, foreign keys)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use strata_core::validation::{parse_tendered, validate_quantity};
//!
//! assert_eq!(parse_tendered("70.00").unwrap().cents(), 7000);
//! assert!(validate_quantity(5).is_ok());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Percent, VoidReason};
use crate::{
    MAX_LINE_QUANTITY, MAX_REASON_LEN, MAX_TAX_PERCENT, MAX_UNIT_PRICE, PARK_CODE_DIGITS,
    PARK_CODE_PREFIX,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Line Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// ## Example
/// ```rust
/// use strata_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(1000).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price: 0 (free items) up to MAX_UNIT_PRICE.
pub fn validate_unit_price(price: Decimal) -> ValidationResult<()> {
    if price < Decimal::ZERO || price > Decimal::from(MAX_UNIT_PRICE) {
        return Err(ValidationError::OutOfRange {
            field: "unit price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE,
        });
    }

    Ok(())
}

/// Validates a line discount: 0 to 100 inclusive.
///
/// ```rust
/// use rust_decimal::Decimal;
/// use strata_core::types::Percent;
/// use strata_core::validation::validate_discount_percent;
///
/// assert!(validate_discount_percent(Percent::new(Decimal::from(100))).is_ok());
/// assert!(validate_discount_percent(Percent::new(Decimal::new(1001, 1))).is_err());
/// ```
pub fn validate_discount_percent(discount: Percent) -> ValidationResult<()> {
    let value = discount.value();
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "discount percent".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a tax rate: 0 to MAX_TAX_PERCENT inclusive.
pub fn validate_tax_percent(tax: Percent) -> ValidationResult<()> {
    let value = tax.value();
    if value < Decimal::ZERO || value > Decimal::from(MAX_TAX_PERCENT) {
        return Err(ValidationError::OutOfRange {
            field: "tax percent".to_string(),
            min: 0,
            max: MAX_TAX_PERCENT,
        });
    }

    Ok(())
}

/// Validates the descriptive fields of a new line.
pub fn validate_line_identity(product_id: &str, variant_id: &str, name: &str) -> ValidationResult<()> {
    for (field, value) in [("product id", product_id), ("variant id", variant_id), ("name", name)] {
        if value.trim().is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }
    }

    if name.trim().len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Reason Validators
// =============================================================================

/// Validates a void reason and returns it.
///
/// ## Rules
/// - A reason must be given
/// - `Other` text must not be blank and at most 200 characters
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Void Item / Void Transaction                                           │
/// │                                                                         │
/// │  Operator picks a reason (or types one under "Other")                  │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_void_reason(reason) ← THIS FUNCTION                          │
/// │       │                                                                 │
/// │       ├── none picked?     → "void reason is required"                 │
/// │       ├── "Other" blank?   → "void reason text is required"            │
/// │       └── OK → line removed / transaction voided                       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_void_reason(reason: Option<&VoidReason>) -> ValidationResult<&VoidReason> {
    let reason = reason.ok_or_else(|| ValidationError::Required {
        field: "void reason".to_string(),
    })?;

    if let VoidReason::Other(text) = reason {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Required {
                field: "void reason text".to_string(),
            });
        }
        if text.len() > MAX_REASON_LEN {
            return Err(ValidationError::TooLong {
                field: "void reason text".to_string(),
                max: MAX_REASON_LEN,
            });
        }
    }

    Ok(reason)
}

/// Normalizes an optional hold reason: blank becomes `None`.
pub fn validate_hold_reason(reason: Option<&str>) -> ValidationResult<Option<String>> {
    let reason = match reason.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(r) => r,
    };

    if reason.len() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "hold reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(Some(reason.to_string()))
}

// =============================================================================
// Payment Validators
// =============================================================================

/// Parses an operator-entered tender amount.
///
/// ## Rules
/// - Must parse as a number with at most 2 decimal places
/// - Must be positive (> 0)
///
/// Sufficiency against the amount due is checked by the checkout.
pub fn parse_tendered(input: &str) -> ValidationResult<Money> {
    let amount = Money::parse(input).map_err(|err| match err {
        ValidationError::Required { .. } => ValidationError::Required {
            field: "amount tendered".to_string(),
        },
        ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat {
            field: "amount tendered".to_string(),
            reason,
        },
        other => other,
    })?;

    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount tendered".to_string(),
        });
    }

    Ok(amount)
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a park code such as `HLD-004217` and returns it trimmed.
///
/// Matching is exact: no case folding, no partial codes.
pub fn validate_park_code(code: &str) -> ValidationResult<&str> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "park code".to_string(),
        });
    }

    let digits = code.strip_prefix(PARK_CODE_PREFIX).ok_or_else(|| ValidationError::InvalidFormat {
        field: "park code".to_string(),
        reason: format!("must start with {}", PARK_CODE_PREFIX),
    })?;

    if digits.len() != PARK_CODE_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "park code".to_string(),
            reason: format!("expected {} digits after {}", PARK_CODE_DIGITS, PARK_CODE_PREFIX),
        });
    }

    Ok(code)
}

/// Validates a customer id: must not be blank.
pub fn validate_customer_id(id: &str) -> ValidationResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "customer id".to_string(),
        });
    }
    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(Decimal::ZERO).is_ok());
        assert!(validate_unit_price(Decimal::new(2999, 2)).is_ok());
        assert!(validate_unit_price(Decimal::from(999_999)).is_ok());
        assert!(validate_unit_price(Decimal::new(-1, 2)).is_err());
        assert!(validate_unit_price(Decimal::new(99_999_901, 2)).is_err());
        assert!(validate_unit_price(Decimal::MAX).is_err());
    }

    #[test]
    fn test_validate_percentages() {
        assert!(validate_discount_percent(Percent::zero()).is_ok());
        assert!(validate_discount_percent(Percent::new(Decimal::from(-1))).is_err());
        assert!(validate_discount_percent(Percent::new(Decimal::from(101))).is_err());

        assert!(validate_tax_percent(Percent::new(Decimal::from(100))).is_ok());
        assert!(validate_tax_percent(Percent::new(Decimal::from(150))).is_err());
        assert!(validate_tax_percent(Percent::new(Decimal::MAX)).is_err());
        assert!(validate_tax_percent(Percent::new(Decimal::new(-5, 1))).is_err());
    }

    #[test]
    fn test_validate_void_reason() {
        assert!(validate_void_reason(None).is_err());
        assert!(validate_void_reason(Some(&VoidReason::ScanError)).is_ok());
        assert!(validate_void_reason(Some(&VoidReason::Other("  ".into()))).is_err());
        assert!(validate_void_reason(Some(&VoidReason::Other("wrong colour".into()))).is_ok());
        assert!(validate_void_reason(Some(&VoidReason::Other("x".repeat(201)))).is_err());
    }

    #[test]
    fn test_validate_hold_reason() {
        assert_eq!(validate_hold_reason(None).unwrap(), None);
        assert_eq!(validate_hold_reason(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_hold_reason(Some(" fetching wallet ")).unwrap().as_deref(),
            Some("fetching wallet")
        );
    }

    #[test]
    fn test_parse_tendered() {
        assert_eq!(parse_tendered("70").unwrap().cents(), 7000);
        assert_eq!(parse_tendered("65.08").unwrap().cents(), 6508);

        let err = parse_tendered("").unwrap_err();
        assert_eq!(err.to_string(), "amount tendered is required");
        assert!(matches!(parse_tendered("abc"), Err(ValidationError::InvalidFormat { .. })));
        assert!(matches!(parse_tendered("0"), Err(ValidationError::MustBePositive { .. })));
        assert!(matches!(parse_tendered("-5"), Err(ValidationError::MustBePositive { .. })));
    }

    #[test]
    fn test_validate_park_code() {
        assert_eq!(validate_park_code(" HLD-004217 ").unwrap(), "HLD-004217");
        assert!(validate_park_code("").is_err());
        assert!(validate_park_code("hld-004217").is_err());
        assert!(validate_park_code("HLD-4217").is_err());
        assert!(validate_park_code("HLD-00421X").is_err());
    }
}
