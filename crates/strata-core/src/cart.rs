//! # Cart State Machine
//!
//! Owns the line list of the active transaction and keeps its totals current.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action         Cart Method            State Change            │
//! │  ───────────────         ───────────            ────────────            │
//! │                                                                         │
//! │  Scan / pick item ─────► add_line() ─────────► merge or push           │
//! │                                                                         │
//! │  Edit qty / % / price ─► update_line() ──────► patch (qty clamps ≥ 1)  │
//! │                                                                         │
//! │  Void item ────────────► remove_line() ──────► remove (reason needed)  │
//! │                                                                         │
//! │  Clear ────────────────► clear() ────────────► lines.clear()           │
//! │                                                                         │
//! │  Every mutation ends in recompute():                                   │
//! │      compute_totals(lines) ──► apply_loyalty(totals, customer, ...)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart has no internal locking; a terminal session owns exactly one.

use crate::error::{CoreError, CoreResult};
use crate::loyalty::{apply_loyalty, LoyaltyAdjustment, LoyaltyConfig};
use crate::money::Money;
use crate::totals::compute_totals;
use crate::types::{CartLine, Customer, LinePatch, NewLine, Totals, VoidReason};
use crate::validation::{
    validate_discount_percent, validate_line_identity, validate_quantity, validate_tax_percent,
    validate_unit_price, validate_void_reason,
};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Line list plus derived totals and loyalty context.
///
/// ## Invariants
/// - Lines are unique by `(product_id, size, color)`
/// - Every line has `1 <= quantity <= 999`
/// - `totals` and `loyalty` always reflect the current lines and customer
#[derive(Debug, Clone)]
pub struct Cart {
    lines: Vec<CartLine>,
    customer: Option<Customer>,
    redeem_loyalty: bool,
    loyalty_config: Option<LoyaltyConfig>,
    totals: Totals,
    loyalty: LoyaltyAdjustment,
}

impl Cart {
    /// Creates an empty cart. `None` disables loyalty entirely.
    pub fn new(loyalty_config: Option<LoyaltyConfig>) -> Self {
        Cart {
            lines: Vec::new(),
            customer: None,
            redeem_loyalty: false,
            loyalty_config,
            totals: Totals::default(),
            loyalty: LoyaltyAdjustment::none(),
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Adds a line, or increments the matching line's quantity.
    ///
    /// ## Behavior
    /// - Same `(product_id, size, color)` already present: quantity increases,
    ///   the existing line keeps its id, price and percentages
    /// - Otherwise: a new line with a fresh id is appended
    ///
    /// ## Returns
    /// The line as it stands after the add.
    pub fn add_line(&mut self, new: NewLine) -> CoreResult<CartLine> {
        validate_line_identity(&new.product_id, &new.variant_id, &new.name)?;
        validate_unit_price(new.unit_price)?;
        validate_discount_percent(new.discount_percent)?;
        validate_tax_percent(new.tax_percent)?;

        let qty = new.quantity.unwrap_or(1);
        validate_quantity(i64::from(qty))?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.merges_with(&new)) {
            let merged = i64::from(line.quantity) + i64::from(qty);
            if merged > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.quantity += qty;
            let updated = line.clone();
            self.recompute();
            return Ok(updated);
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        let line = CartLine::from_new(&new, qty);
        self.lines.push(line.clone());
        self.recompute();
        Ok(line)
    }

    /// Applies a partial update to one line.
    ///
    /// Quantity below 1 clamps to 1. Unknown ids fail with `LineNotFound`.
    pub fn update_line(&mut self, line_id: &str, patch: &LinePatch) -> CoreResult<CartLine> {
        let quantity = match patch.quantity {
            Some(q) => {
                let clamped = q.max(1);
                if clamped > MAX_LINE_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: clamped,
                        max: MAX_LINE_QUANTITY,
                    });
                }
                Some(clamped as u32)
            }
            None => None,
        };
        if let Some(discount) = patch.discount_percent {
            validate_discount_percent(discount)?;
        }
        if let Some(price) = patch.unit_price {
            validate_unit_price(price)?;
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;

        if let Some(q) = quantity {
            line.quantity = q;
        }
        if let Some(discount) = patch.discount_percent {
            line.discount_percent = discount;
        }
        if let Some(price) = patch.unit_price {
            line.unit_price = price;
        }

        let updated = line.clone();
        self.recompute();
        Ok(updated)
    }

    /// Removes a line. A reason is mandatory even when the id is unknown.
    ///
    /// ## Returns
    /// The removed line, or `None` when no line had that id.
    pub fn remove_line(&mut self, line_id: &str, reason: Option<&VoidReason>) -> CoreResult<Option<CartLine>> {
        validate_void_reason(reason)?;

        let removed = match self.lines.iter().position(|l| l.id == line_id) {
            Some(idx) => Some(self.lines.remove(idx)),
            None => None,
        };
        self.recompute();
        Ok(removed)
    }

    /// Empties the cart. Customer and loyalty choice stay attached.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.recompute();
    }

    /// Attaches or detaches the customer. Detaching also turns redemption off.
    pub fn set_customer(&mut self, customer: Option<Customer>) {
        if customer.is_none() {
            self.redeem_loyalty = false;
        }
        self.customer = customer;
        self.recompute();
    }

    /// Turns point redemption on or off.
    pub fn set_redeem(&mut self, redeem: bool) {
        self.redeem_loyalty = redeem;
        self.recompute();
    }

    /// Replaces the whole cart contents, as when a held transaction is retrieved.
    pub fn restore(&mut self, lines: Vec<CartLine>, customer: Option<Customer>, redeem: bool) {
        self.lines = lines;
        self.customer = customer;
        self.redeem_loyalty = redeem && self.customer.is_some();
        self.recompute();
    }

    /// Drops lines, customer and loyalty choice.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.customer = None;
        self.redeem_loyalty = false;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.totals = compute_totals(&self.lines);
        self.loyalty = match &self.loyalty_config {
            Some(config) => apply_loyalty(&self.totals, self.customer.as_ref(), self.redeem_loyalty, config),
            None => LoyaltyAdjustment::none(),
        };
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Quantity already in the cart for the line `new` would merge into.
    pub fn quantity_matching(&self, new: &NewLine) -> u32 {
        self.lines
            .iter()
            .find(|l| l.merges_with(new))
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn loyalty(&self) -> &LoyaltyAdjustment {
        &self.loyalty
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn redeem_loyalty(&self) -> bool {
        self.redeem_loyalty
    }

    pub fn loyalty_enabled(&self) -> bool {
        self.loyalty_config.is_some()
    }

    /// Grand total minus loyalty discount, rounded once.
    pub fn amount_due(&self) -> Money {
        Money::from_decimal(self.totals.grand_total - self.loyalty.loyalty_discount)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Percent;
    use rust_decimal::Decimal;

    fn shirt(size: &str, color: &str, qty: Option<u32>) -> NewLine {
        NewLine {
            product_id: "p-shirt".to_string(),
            variant_id: format!("v-shirt-{}-{}", size, color),
            name: "Shirt".to_string(),
            size: Some(size.to_string()),
            color: Some(color.to_string()),
            quantity: qty,
            unit_price: Decimal::new(2999, 2),
            discount_percent: Percent::zero(),
            tax_percent: Percent::new(Decimal::new(85, 1)),
            category_id: Some("tops".to_string()),
        }
    }

    fn member(points: i64) -> Customer {
        Customer {
            id: "c-1".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: Some("grace@example.com".to_string()),
            loyalty_points: points,
            loyalty_program: None,
        }
    }

    #[test]
    fn test_add_defaults_to_one() {
        let mut cart = Cart::new(None);
        let line = cart.add_line(shirt("M", "Blue", None)).unwrap();

        assert_eq!(line.quantity, 1);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.totals().subtotal, Decimal::new(2999, 2));
    }

    #[test]
    fn test_add_same_variant_merges() {
        let mut cart = Cart::new(None);
        let first = cart.add_line(shirt("M", "Blue", None)).unwrap();
        let second = cart.add_line(shirt("M", "Blue", None)).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 2);
        assert_eq!(cart.amount_due().cents(), 6508);
    }

    #[test]
    fn test_different_color_is_new_line() {
        let mut cart = Cart::new(None);
        cart.add_line(shirt("M", "Blue", None)).unwrap();
        cart.add_line(shirt("M", "Red", Some(2))).unwrap();

        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_merge_cannot_exceed_max_quantity() {
        let mut cart = Cart::new(None);
        cart.add_line(shirt("M", "Blue", Some(999))).unwrap();
        let err = cart.add_line(shirt("M", "Blue", None)).unwrap_err();

        assert!(matches!(err, CoreError::QuantityTooLarge { requested: 1000, .. }));
        assert_eq!(cart.lines()[0].quantity, 999);
    }

    #[test]
    fn test_line_limit() {
        let mut cart = Cart::new(None);
        for i in 0..MAX_CART_LINES {
            cart.add_line(shirt(&i.to_string(), "Blue", None)).unwrap();
        }
        let err = cart.add_line(shirt("XXL", "Green", None)).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_invalid_add_leaves_cart_untouched() {
        let mut cart = Cart::new(None);
        let mut bad = shirt("M", "Blue", None);
        bad.discount_percent = Percent::new(Decimal::from(120));

        assert!(cart.add_line(bad).is_err());
        assert!(cart.is_empty());
        assert_eq!(cart.totals(), &Totals::default());
    }

    #[test]
    fn test_absurd_price_rejected_and_cart_still_usable() {
        let mut cart = Cart::new(None);
        let mut bad = shirt("M", "Blue", Some(999));
        bad.unit_price = Decimal::MAX;
        assert!(matches!(cart.add_line(bad), Err(CoreError::Validation(_))));
        assert!(cart.is_empty());

        let mut steep = shirt("M", "Blue", None);
        steep.tax_percent = Percent::new(Decimal::MAX);
        assert!(cart.add_line(steep).is_err());

        let line = cart.add_line(shirt("M", "Blue", None)).unwrap();
        let err = cart
            .update_line(
                &line.id,
                &LinePatch {
                    unit_price: Some(Decimal::MAX),
                    ..LinePatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(cart.lines()[0].unit_price, Decimal::new(2999, 2));

        cart.add_line(shirt("L", "Blue", Some(2))).unwrap();
        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.totals().summary().subtotal.cents(), 8997);
    }

    #[test]
    fn test_update_clamps_quantity_to_one() {
        let mut cart = Cart::new(None);
        let line = cart.add_line(shirt("M", "Blue", Some(3))).unwrap();

        let updated = cart
            .update_line(
                &line.id,
                &LinePatch {
                    quantity: Some(0),
                    ..LinePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.quantity, 1);

        let updated = cart
            .update_line(
                &line.id,
                &LinePatch {
                    quantity: Some(-7),
                    ..LinePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.quantity, 1);
    }

    #[test]
    fn test_update_discount_recomputes() {
        let mut cart = Cart::new(None);
        let line = cart.add_line(shirt("M", "Blue", Some(2))).unwrap();

        cart.update_line(
            &line.id,
            &LinePatch {
                discount_percent: Some(Percent::new(Decimal::from(50))),
                ..LinePatch::default()
            },
        )
        .unwrap();

        assert_eq!(cart.totals().total_discount, Decimal::new(2999, 2));
    }

    #[test]
    fn test_update_unknown_line() {
        let mut cart = Cart::new(None);
        let err = cart.update_line("nope", &LinePatch::default()).unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound(_)));
    }

    #[test]
    fn test_remove_requires_reason() {
        let mut cart = Cart::new(None);
        let line = cart.add_line(shirt("M", "Blue", None)).unwrap();

        assert!(cart.remove_line(&line.id, None).is_err());
        assert_eq!(cart.line_count(), 1);

        let removed = cart.remove_line(&line.id, Some(&VoidReason::ScanError)).unwrap();
        assert_eq!(removed.map(|l| l.id), Some(line.id));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut cart = Cart::new(None);
        cart.add_line(shirt("M", "Blue", None)).unwrap();

        let removed = cart.remove_line("nope", Some(&VoidReason::CustomerRequest)).unwrap();
        assert!(removed.is_none());
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_clear_keeps_customer() {
        let mut cart = Cart::new(None);
        cart.set_customer(Some(member(100)));
        cart.add_line(shirt("M", "Blue", None)).unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.customer().is_some());
        assert_eq!(cart.amount_due(), Money::zero());
    }

    #[test]
    fn test_loyalty_applied_after_every_mutation() {
        let config = LoyaltyConfig::new(Decimal::new(1, 2), Decimal::ONE).unwrap();
        let mut cart = Cart::new(Some(config));
        cart.set_customer(Some(member(500)));
        cart.set_redeem(true);

        cart.add_line(shirt("M", "Blue", Some(2))).unwrap();
        assert_eq!(cart.loyalty().loyalty_discount, Decimal::from(5));
        assert_eq!(cart.amount_due().cents(), 6008);

        cart.set_customer(None);
        assert!(!cart.redeem_loyalty());
        assert_eq!(cart.amount_due().cents(), 6508);
    }

    #[test]
    fn test_loyalty_disabled_without_config() {
        let mut cart = Cart::new(None);
        cart.set_customer(Some(member(500)));
        cart.set_redeem(true);
        cart.add_line(shirt("M", "Blue", Some(2))).unwrap();

        assert!(!cart.loyalty_enabled());
        assert_eq!(cart.loyalty(), &LoyaltyAdjustment::none());
    }
}
