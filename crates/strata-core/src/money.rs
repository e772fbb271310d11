//! # Money Module
//!
//! Two representations of money live side by side:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WORKING PRECISION                    BOUNDARY PRECISION                │
//! │  rust_decimal::Decimal                Money (i64 cents)                 │
//! │                                                                         │
//! │  29.99 × 2 × 8.5%  = 5.09830          round_money(5.0983) = 5.10        │
//! │  59.98 + 5.0983    = 65.07830   ───►  Money::from_decimal  = 6508 cents │
//! │                                                                         │
//! │  Totals accumulate in Decimal with no per-line rounding.               │
//! │  Rounding to 2 places happens once, when a value is displayed,         │
//! │  compared against a tender, or persisted.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use strata_core::money::Money;
//!
//! let due = Money::from_decimal(Decimal::new(650783, 4)); // 65.0783
//! assert_eq!(due.cents(), 6508);
//! assert_eq!(due.to_string(), "65.08");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Decimal places used for every presented or persisted amount.
pub const MONEY_SCALE: u32 = 2;

/// Rounds a working-precision amount to cents (half away from zero).
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use strata_core::money::round_money;
///
/// assert_eq!(round_money(Decimal::new(50983, 4)), Decimal::new(510, 2)); // 5.0983 → 5.10
/// assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));  // 1.005 → 1.01
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Money Type
// =============================================================================

/// A rounded monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// Totals (Decimal) ──► TotalsSummary (Money) ──► TransactionRecord ──► SQLite
///                                    │
///                                    └──► Payment (tendered, change, paid)
///                                    └──► ReceiptDocument
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use strata_core::money::Money;
    ///
    /// let price = Money::from_cents(2999);
    /// assert_eq!(price.cents(), 2999);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds a Decimal to cents and wraps it.
    ///
    /// Amounts beyond the i64 cent range saturate.
    pub fn from_decimal(amount: Decimal) -> Self {
        let saturated = if amount.is_sign_negative() { i64::MIN } else { i64::MAX };
        let cents = round_money(amount)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .unwrap_or(saturated);
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as a 2-place Decimal.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Formats with a currency symbol, e.g. `$65.08` or `-$5.50`.
    pub fn format_with(&self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}{}.{:02}", sign, symbol, (self.0 / 100).abs(), (self.0 % 100).abs())
    }

    /// Parses an operator-entered amount such as `"70"`, `"70.00"` or `" 4.5 "`.
    ///
    /// ## Rules
    /// - Must parse as a decimal number
    /// - At most 2 decimal places (no sub-cent tenders)
    ///
    /// Sign is not checked here; see [`crate::validation::parse_tendered`].
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let value = Decimal::from_str(trimmed).map_err(|_| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{}' is not a number", trimmed),
        })?;

        if value.normalize().scale() > MONEY_SCALE {
            return Err(ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: "at most 2 decimal places".to_string(),
            });
        }

        Ok(Money::from_decimal(value))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain amount without a symbol: `65.08`, `-5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_rounds_once() {
        assert_eq!(Money::from_decimal(Decimal::new(650783, 4)).cents(), 6508);
        assert_eq!(Money::from_decimal(Decimal::new(153, 2)).cents(), 153);
        assert_eq!(Money::from_decimal(Decimal::new(5, 3)).cents(), 1); // 0.005 → 0.01
        assert_eq!(Money::from_decimal(Decimal::new(-5, 3)).cents(), -1);
        assert_eq!(Money::from_decimal(Decimal::ZERO).cents(), 0);
        assert_eq!(Money::from_decimal(Decimal::from(12)).cents(), 1200);
    }

    #[test]
    fn test_from_decimal_saturates() {
        assert_eq!(Money::from_decimal(Decimal::MAX).cents(), i64::MAX);
        assert_eq!(Money::from_decimal(Decimal::MIN).cents(), i64::MIN);
        assert_eq!(Money::parse("79228162514264337593543950335").unwrap().cents(), i64::MAX);
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(Money::from_cents(492).to_decimal(), Decimal::new(492, 2));
        assert_eq!(Money::from_cents(-550).to_decimal(), Decimal::new(-550, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_format_with_symbol() {
        assert_eq!(Money::from_cents(6508).format_with("$"), "$65.08");
        assert_eq!(Money::from_cents(-550).format_with("€"), "-€5.50");
        assert_eq!(Money::from_cents(7).format_with("$"), "$0.07");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(7000);
        let b = Money::from_cents(6508);

        assert_eq!((a - b).cents(), 492);
        assert_eq!((a + b).cents(), 13508);
        assert_eq!((b * 2).cents(), 13016);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("70").unwrap().cents(), 7000);
        assert_eq!(Money::parse(" 70.00 ").unwrap().cents(), 7000);
        assert_eq!(Money::parse("4.5").unwrap().cents(), 450);
        assert_eq!(Money::parse("-3").unwrap().cents(), -300);

        assert!(Money::parse("").is_err());
        assert!(Money::parse("seventy").is_err());
        assert!(Money::parse("1.005").is_err());
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
    }
}
