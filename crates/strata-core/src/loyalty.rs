//! # Loyalty Adjuster
//!
//! Applies point redemption to a set of totals and previews points earned.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  No customer, or redeem == false                                        │
//! │      → discount 0, points redeemed 0                                    │
//! │                                                                         │
//! │  Redeeming                                                              │
//! │      balance value = points × point_value                               │
//! │      discount      = min(balance value, grand total), never < 0         │
//! │      redeemed      = ceil(discount / point_value), capped at balance    │
//! │                                                                         │
//! │  Earning (always, when a customer is attached)                          │
//! │      earned = (grand total − discount) × earn_rate   (preview, ≥ 0)     │
//! │      committed points = floor(earned)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A short balance clamps the discount; it never fails.
//!
//! Both rates come from configuration; [`LoyaltyConfig`] has no `Default`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Customer, LoyaltySummary, Totals};

// =============================================================================
// Loyalty Config
// =============================================================================

/// Conversion rates for the loyalty program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyConfig {
    /// Currency value of one point when redeeming (e.g. 0.01).
    point_value: Decimal,
    /// Points earned per currency unit paid (e.g. 1 point per 1.00).
    earn_rate: Decimal,
}

impl LoyaltyConfig {
    /// Creates a config; both rates must be positive.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use strata_core::loyalty::LoyaltyConfig;
    ///
    /// assert!(LoyaltyConfig::new(Decimal::new(1, 2), Decimal::ONE).is_ok());
    /// assert!(LoyaltyConfig::new(Decimal::ZERO, Decimal::ONE).is_err());
    /// ```
    pub fn new(point_value: Decimal, earn_rate: Decimal) -> CoreResult<Self> {
        if point_value <= Decimal::ZERO {
            return Err(CoreError::InvalidLoyaltyConfig(format!(
                "point value must be positive, got {}",
                point_value
            )));
        }
        if earn_rate <= Decimal::ZERO {
            return Err(CoreError::InvalidLoyaltyConfig(format!(
                "earn rate must be positive, got {}",
                earn_rate
            )));
        }
        Ok(LoyaltyConfig {
            point_value,
            earn_rate,
        })
    }

    #[inline]
    pub fn point_value(&self) -> Decimal {
        self.point_value
    }

    #[inline]
    pub fn earn_rate(&self) -> Decimal {
        self.earn_rate
    }
}

// =============================================================================
// Loyalty Adjustment
// =============================================================================

/// Result of applying loyalty to a set of totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAdjustment {
    /// Working-precision discount taken off the grand total.
    #[ts(type = "string")]
    pub loyalty_discount: Decimal,
    /// Fractional preview of points the sale will earn.
    #[ts(type = "string")]
    pub points_earned: Decimal,
    pub points_redeemed: i64,
    pub redeem: bool,
}

impl LoyaltyAdjustment {
    /// No discount, no points. Used when loyalty is disabled.
    pub fn none() -> Self {
        LoyaltyAdjustment::default()
    }

    /// Whole points credited at commit.
    pub fn committed_points_earned(&self) -> i64 {
        self.points_earned.floor().to_i64().unwrap_or(0).max(0)
    }

    /// Committed values for the transaction record.
    pub fn summary(&self) -> LoyaltySummary {
        LoyaltySummary {
            points_earned: self.committed_points_earned(),
            points_redeemed: self.points_redeemed,
            loyalty_discount: Money::from_decimal(self.loyalty_discount),
            redeemed: self.redeem && self.points_redeemed > 0,
        }
    }
}

/// Applies redemption and previews earning for `customer`.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use strata_core::loyalty::{apply_loyalty, LoyaltyConfig};
/// use strata_core::types::Totals;
///
/// let config = LoyaltyConfig::new(Decimal::new(1, 2), Decimal::ONE).unwrap();
/// let totals = Totals { grand_total: Decimal::from(10), ..Totals::default() };
///
/// // No customer: nothing applies
/// let adj = apply_loyalty(&totals, None, true, &config);
/// assert_eq!(adj.loyalty_discount, Decimal::ZERO);
/// ```
pub fn apply_loyalty(
    totals: &Totals,
    customer: Option<&Customer>,
    redeem: bool,
    config: &LoyaltyConfig,
) -> LoyaltyAdjustment {
    let customer = match customer {
        Some(c) => c,
        None => return LoyaltyAdjustment::none(),
    };

    let payable_before = totals.grand_total.max(Decimal::ZERO);
    let balance = customer.loyalty_points.max(0);

    let (loyalty_discount, points_redeemed) = if redeem && balance > 0 {
        let balance_value = Decimal::from(balance) * config.point_value;
        let discount = balance_value.min(payable_before).max(Decimal::ZERO);
        let points = (discount / config.point_value)
            .ceil()
            .to_i64()
            .unwrap_or(balance)
            .min(balance);
        (discount, points)
    } else {
        (Decimal::ZERO, 0)
    };

    let payable = (payable_before - loyalty_discount).max(Decimal::ZERO);
    let points_earned = (payable * config.earn_rate).max(Decimal::ZERO);

    LoyaltyAdjustment {
        loyalty_discount,
        points_earned,
        points_redeemed,
        redeem,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LoyaltyConfig {
        // 1 point = 0.01, 1 point per 1.00 spent
        LoyaltyConfig::new(Decimal::new(1, 2), Decimal::ONE).unwrap()
    }

    fn customer(points: i64) -> Customer {
        Customer {
            id: "c-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            email: None,
            loyalty_points: points,
            loyalty_program: Some("Gold".to_string()),
        }
    }

    fn totals(grand: Decimal) -> Totals {
        Totals {
            subtotal: grand,
            grand_total: grand,
            ..Totals::default()
        }
    }

    #[test]
    fn test_no_customer_no_effect() {
        let adj = apply_loyalty(&totals(Decimal::from(50)), None, true, &config());
        assert_eq!(adj, LoyaltyAdjustment::none());
    }

    #[test]
    fn test_not_redeeming_only_earns() {
        let adj = apply_loyalty(&totals(Decimal::new(6508, 2)), Some(&customer(500)), false, &config());
        assert_eq!(adj.loyalty_discount, Decimal::ZERO);
        assert_eq!(adj.points_redeemed, 0);
        assert_eq!(adj.points_earned, Decimal::new(6508, 2));
        assert_eq!(adj.committed_points_earned(), 65);
    }

    #[test]
    fn test_redeem_bounded_by_balance() {
        // 500 points = 5.00 against a 65.08 total
        let adj = apply_loyalty(&totals(Decimal::new(6508, 2)), Some(&customer(500)), true, &config());
        assert_eq!(adj.loyalty_discount, Decimal::from(5));
        assert_eq!(adj.points_redeemed, 500);
        assert_eq!(adj.committed_points_earned(), 60);
    }

    #[test]
    fn test_redeem_clamped_to_grand_total() {
        // 10_000 points = 100.00 against a 12.34 total
        let adj = apply_loyalty(&totals(Decimal::new(1234, 2)), Some(&customer(10_000)), true, &config());
        assert_eq!(adj.loyalty_discount, Decimal::new(1234, 2));
        assert_eq!(adj.points_redeemed, 1234);
        assert_eq!(adj.points_earned, Decimal::ZERO);
    }

    #[test]
    fn test_zero_balance_clamps_instead_of_failing() {
        let adj = apply_loyalty(&totals(Decimal::from(20)), Some(&customer(0)), true, &config());
        assert_eq!(adj.loyalty_discount, Decimal::ZERO);
        assert_eq!(adj.points_redeemed, 0);
        assert!(!adj.summary().redeemed);
    }

    #[test]
    fn test_redeemed_points_never_exceed_balance() {
        // point value 0.03: 7 points = 0.21, total 0.20 → discount 0.20, ceil(6.67) = 7
        let config = LoyaltyConfig::new(Decimal::new(3, 2), Decimal::ONE).unwrap();
        let adj = apply_loyalty(&totals(Decimal::new(20, 2)), Some(&customer(7)), true, &config);
        assert_eq!(adj.loyalty_discount, Decimal::new(20, 2));
        assert_eq!(adj.points_redeemed, 7);
    }

    #[test]
    fn test_invalid_config() {
        assert!(LoyaltyConfig::new(Decimal::new(1, 2), Decimal::ZERO).is_err());
        assert!(LoyaltyConfig::new(Decimal::from(-1), Decimal::ONE).is_err());
    }
}
