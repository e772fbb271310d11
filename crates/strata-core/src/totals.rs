//! # Totals Calculator
//!
//! Derives [`Totals`] from a line list. Pure and idempotent.
//!
//! ## Per-Line Math
//! ```text
//! gross    = unit_price × quantity
//! discount = gross × discount% / 100
//! after    = gross − discount
//! tax      = after × tax% / 100
//! ```
//!
//! Lines accumulate into the subtotal and total discount; tax is grouped by
//! rate in first-seen order. Nothing is rounded here: the caller rounds once
//! via [`Totals::summary`] when presenting or persisting.
//!
//! ## Example
//! ```rust
//! use rust_decimal::Decimal;
//! use strata_core::totals::compute_totals;
//!
//! let totals = compute_totals(&[]);
//! assert_eq!(totals.grand_total, Decimal::ZERO);
//! assert!(totals.tax_breakdown.is_empty());
//! ```

use rust_decimal::Decimal;

use crate::types::{CartLine, TaxLine, Totals};

/// Computes subtotal, discount, per-rate tax and grand total.
pub fn compute_totals(lines: &[CartLine]) -> Totals {
    let mut subtotal = Decimal::ZERO;
    let mut total_discount = Decimal::ZERO;
    let mut tax_breakdown: Vec<TaxLine> = Vec::new();

    for line in lines {
        subtotal += line.gross();
        total_discount += line.discount_amount();

        let tax = line.tax_amount();
        match tax_breakdown.iter_mut().find(|t| t.rate == line.tax_percent) {
            Some(existing) => existing.amount += tax,
            None => tax_breakdown.push(TaxLine {
                rate: line.tax_percent,
                amount: tax,
            }),
        }
    }

    let total_tax: Decimal = tax_breakdown.iter().map(|t| t.amount).sum();

    Totals {
        subtotal,
        total_discount,
        tax_breakdown,
        total_tax,
        grand_total: subtotal - total_discount + total_tax,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewLine, Percent};

    fn line(name: &str, price: Decimal, qty: u32, discount: Decimal, tax: Decimal) -> CartLine {
        let new = NewLine {
            product_id: format!("p-{}", name),
            variant_id: format!("v-{}", name),
            name: name.to_string(),
            size: None,
            color: None,
            quantity: Some(qty),
            unit_price: price,
            discount_percent: Percent::new(discount),
            tax_percent: Percent::new(tax),
            category_id: None,
        };
        CartLine::from_new(&new, qty)
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let totals = compute_totals(&[]);
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn test_discount_then_tax() {
        // 10.00 × 2, 10% off, 8.5% tax
        let lines = [line("a", Decimal::from(10), 2, Decimal::from(10), Decimal::new(85, 1))];
        let totals = compute_totals(&lines);

        assert_eq!(totals.subtotal, Decimal::from(20));
        assert_eq!(totals.total_discount, Decimal::from(2));
        assert_eq!(totals.total_tax, Decimal::new(153, 2));
        assert_eq!(totals.grand_total, Decimal::new(1953, 2));
    }

    #[test]
    fn test_shirt_scenario_rounds_once() {
        let lines = [line("shirt", Decimal::new(2999, 2), 2, Decimal::ZERO, Decimal::new(85, 1))];
        let totals = compute_totals(&lines);

        // Working precision keeps the fraction
        assert_eq!(totals.total_tax, Decimal::new(50983, 4));

        let summary = totals.summary();
        assert_eq!(summary.subtotal.cents(), 5998);
        assert_eq!(summary.total_tax.cents(), 510);
        assert_eq!(summary.grand_total.cents(), 6508);
    }

    #[test]
    fn test_tax_grouped_by_rate_first_seen() {
        let lines = [
            line("a", Decimal::from(10), 1, Decimal::ZERO, Decimal::from(5)),
            line("b", Decimal::from(20), 1, Decimal::ZERO, Decimal::new(85, 1)),
            line("c", Decimal::from(30), 1, Decimal::ZERO, Decimal::from(5)),
        ];
        let totals = compute_totals(&lines);

        assert_eq!(totals.tax_breakdown.len(), 2);
        assert_eq!(totals.tax_breakdown[0].rate, Percent::new(Decimal::from(5)));
        assert_eq!(totals.tax_breakdown[0].amount, Decimal::from(2));
        assert_eq!(totals.tax_breakdown[1].rate, Percent::new(Decimal::new(85, 1)));
        assert_eq!(totals.tax_breakdown[1].amount, Decimal::new(17, 1));
    }

    #[test]
    fn test_totals_identity_holds() {
        let lines = [
            line("a", Decimal::new(1999, 2), 3, Decimal::new(125, 1), Decimal::new(725, 2)),
            line("b", Decimal::new(333, 2), 7, Decimal::from(50), Decimal::ZERO),
            line("c", Decimal::ZERO, 1, Decimal::ZERO, Decimal::from(20)),
        ];
        let totals = compute_totals(&lines);

        assert_eq!(
            totals.grand_total,
            totals.subtotal - totals.total_discount + totals.total_tax
        );
        let breakdown_sum: Decimal = totals.tax_breakdown.iter().map(|t| t.amount).sum();
        assert_eq!(breakdown_sum, totals.total_tax);
    }

    #[test]
    fn test_idempotent() {
        let lines = [line("a", Decimal::new(2999, 2), 2, Decimal::from(15), Decimal::new(85, 1))];
        assert_eq!(compute_totals(&lines), compute_totals(&lines));
    }

    #[test]
    fn test_full_discount_zeroes_tax() {
        let lines = [line("a", Decimal::from(50), 1, Decimal::from(100), Decimal::from(10))];
        let totals = compute_totals(&lines);

        assert_eq!(totals.total_discount, Decimal::from(50));
        assert_eq!(totals.total_tax, Decimal::ZERO);
        assert_eq!(totals.grand_total, Decimal::ZERO);
    }
}
