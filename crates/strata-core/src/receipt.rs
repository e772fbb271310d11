//! # Receipt Projection
//!
//! Turns a completed [`TransactionRecord`] into a [`ReceiptDocument`]: the
//! data contract handed to whatever prints or displays receipts.
//!
//! ## Layout of `render_text(40)`
//! ```text
//!               Strata Outfitters
//!                 12 Market St
//!               Tel: 555-0100
//! ========================================
//! TXN-250301-143015-0042
//! 2025-03-01 14:30                Ada Byron
//! ----------------------------------------
//! 2 x Shirt (M / Blue)               59.98
//! ----------------------------------------
//! Subtotal                          $59.98
//! Tax 8.5%                           $5.10
//! TOTAL                             $65.08
//! Cash                              $70.00
//! Change                             $4.92
//! Points earned                         65
//! ========================================
//! ```
//!
//! Sections with nothing to show (discounts, customer, change on card
//! payments, points) are left out of both the document and the text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Percent, TaxAmount, TransactionRecord, TransactionStatus};

// =============================================================================
// Store Config
// =============================================================================

/// Store identity printed on receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub company_name: String,
    pub address_lines: Vec<String>,
    pub phone: Option<String>,
    pub currency_symbol: String,
    /// Logo asset reference (path or URL).
    pub logo: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            company_name: "Strata POS".to_string(),
            address_lines: Vec::new(),
            phone: None,
            currency_symbol: "$".to_string(),
            logo: None,
        }
    }
}

// =============================================================================
// Receipt Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub variant: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    /// Present only when the line was discounted.
    #[ts(type = "string | null")]
    pub discount_percent: Option<Percent>,
    /// After discount, before tax.
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayment {
    pub method: PaymentMethod,
    pub amount_paid: Money,
    /// Cash only.
    pub tendered: Option<Money>,
    /// Cash only.
    pub change: Option<Money>,
}

/// Printable projection of a completed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDocument {
    pub store: StoreConfig,
    pub transaction_number: String,
    #[ts(as = "String")]
    pub completed_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Money,
    pub discount: Option<Money>,
    pub tax_lines: Vec<TaxAmount>,
    pub total_tax: Money,
    pub grand_total: Money,
    pub loyalty_discount: Option<Money>,
    pub amount_due: Money,
    pub payment: ReceiptPayment,
    pub points_earned: Option<i64>,
    pub points_redeemed: Option<i64>,
}

/// Projects a completed record into a receipt.
///
/// ## Errors
/// - `InvalidTransactionStatus` if the record is not completed
/// - `PaymentMissing` if it carries no payment
pub fn project(record: &TransactionRecord, store: &StoreConfig) -> CoreResult<ReceiptDocument> {
    if record.status != TransactionStatus::Completed {
        return Err(CoreError::InvalidTransactionStatus {
            transaction_number: record.transaction_number.clone(),
            status: record.status,
            operation: "print receipt",
        });
    }
    let payment = record
        .payment
        .as_ref()
        .ok_or_else(|| CoreError::PaymentMissing(record.transaction_number.clone()))?;

    let lines = record
        .cart_items
        .iter()
        .map(|line| ReceiptLine {
            name: line.name.clone(),
            variant: line.variant_label(),
            quantity: line.quantity,
            unit_price: Money::from_decimal(line.unit_price),
            discount_percent: (!line.discount_percent.is_zero()).then_some(line.discount_percent),
            line_total: Money::from_decimal(line.net()),
        })
        .collect();

    let is_cash = payment.method == PaymentMethod::Cash;
    let loyalty = &record.loyalty;

    Ok(ReceiptDocument {
        store: store.clone(),
        transaction_number: record.transaction_number.clone(),
        completed_at: record.completed_at.unwrap_or(payment.paid_at),
        customer_name: record.customer.as_ref().map(|c| c.name.clone()),
        lines,
        subtotal: record.totals.subtotal,
        discount: non_zero(record.totals.total_discount),
        tax_lines: record.totals.tax_breakdown.clone(),
        total_tax: record.totals.total_tax,
        grand_total: record.totals.grand_total,
        loyalty_discount: non_zero(loyalty.loyalty_discount),
        amount_due: record.amount_due,
        payment: ReceiptPayment {
            method: payment.method,
            amount_paid: payment.amount_paid,
            tendered: is_cash.then_some(payment.amount_tendered),
            change: is_cash.then_some(payment.change_due),
        },
        points_earned: (record.customer.is_some() && loyalty.points_earned > 0).then_some(loyalty.points_earned),
        points_redeemed: (loyalty.points_redeemed > 0).then_some(loyalty.points_redeemed),
    })
}

fn non_zero(amount: Money) -> Option<Money> {
    (!amount.is_zero()).then_some(amount)
}

// =============================================================================
// Text Rendering
// =============================================================================

impl ReceiptDocument {
    /// Renders fixed-width text lines for a line printer.
    pub fn render_text(&self, width: usize) -> Vec<String> {
        let width = width.max(24);
        let sym = self.store.currency_symbol.as_str();
        let mut out = TextBuilder::new(width);

        out.center(&self.store.company_name);
        for line in &self.store.address_lines {
            out.center(line);
        }
        if let Some(phone) = &self.store.phone {
            out.center(&format!("Tel: {}", phone));
        }
        out.sep('=');

        out.left(&self.transaction_number);
        out.left_right(
            &self.completed_at.format("%Y-%m-%d %H:%M").to_string(),
            self.customer_name.as_deref().unwrap_or(""),
        );
        out.sep('-');

        for line in &self.lines {
            let label = match &line.variant {
                Some(v) => format!("{} x {} ({})", line.quantity, line.name, v),
                None => format!("{} x {}", line.quantity, line.name),
            };
            out.left_right(&label, &line.line_total.to_string());
            if let Some(pct) = line.discount_percent {
                out.left(&format!("   -{} off {} each", pct, line.unit_price.format_with(sym)));
            }
        }
        out.sep('-');

        out.left_right("Subtotal", &self.subtotal.format_with(sym));
        if let Some(discount) = self.discount {
            out.left_right("Discount", &(-discount).format_with(sym));
        }
        for tax in &self.tax_lines {
            out.left_right(&format!("Tax {}", tax.rate), &tax.amount.format_with(sym));
        }
        out.left_right("TOTAL", &self.grand_total.format_with(sym));
        if let Some(loyalty) = self.loyalty_discount {
            out.left_right("Points discount", &(-loyalty).format_with(sym));
            out.left_right("AMOUNT DUE", &self.amount_due.format_with(sym));
        }

        match self.payment.tendered {
            Some(tendered) => out.left_right(self.payment.method.label(), &tendered.format_with(sym)),
            None => out.left_right(self.payment.method.label(), &self.payment.amount_paid.format_with(sym)),
        }
        if let Some(change) = self.payment.change {
            out.left_right("Change", &change.format_with(sym));
        }

        if let Some(points) = self.points_redeemed {
            out.left_right("Points redeemed", &points.to_string());
        }
        if let Some(points) = self.points_earned {
            out.left_right("Points earned", &points.to_string());
        }
        out.sep('=');

        out.finish()
    }
}

struct TextBuilder {
    width: usize,
    lines: Vec<String>,
}

impl TextBuilder {
    fn new(width: usize) -> Self {
        TextBuilder {
            width,
            lines: Vec::new(),
        }
    }

    fn left(&mut self, text: &str) {
        self.lines.push(truncate(text, self.width));
    }

    fn center(&mut self, text: &str) {
        let text = truncate(text, self.width);
        let pad = (self.width - text.chars().count()) / 2;
        self.lines.push(format!("{}{}", " ".repeat(pad), text).trim_end().to_string());
    }

    /// Left text, right-aligned value; the left side is cut to make room.
    fn left_right(&mut self, left: &str, right: &str) {
        let right_len = right.chars().count();
        let room = self.width.saturating_sub(right_len + 1);
        let left = truncate(left, room);
        let gap = self.width.saturating_sub(left.chars().count() + right_len);
        self.lines.push(format!("{}{}{}", left, " ".repeat(gap), right).trim_end().to_string());
    }

    fn sep(&mut self, ch: char) {
        self.lines.push(ch.to_string().repeat(self.width));
    }

    fn finish(self) -> Vec<String> {
        self.lines
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartLine, CustomerRef, LoyaltySummary, NewLine, Payment, TotalsSummary};
    use crate::totals::compute_totals;
    use rust_decimal::Decimal;

    fn shirt_line() -> CartLine {
        let new = NewLine {
            product_id: "p-shirt".into(),
            variant_id: "v-shirt-m-blue".into(),
            name: "Shirt".into(),
            size: Some("M".into()),
            color: Some("Blue".into()),
            quantity: Some(2),
            unit_price: Decimal::new(2999, 2),
            discount_percent: Percent::zero(),
            tax_percent: Percent::new(Decimal::new(85, 1)),
            category_id: None,
        };
        CartLine::from_new(&new, 2)
    }

    fn completed(method: PaymentMethod, tendered: i64) -> TransactionRecord {
        let lines = vec![shirt_line()];
        let totals: TotalsSummary = compute_totals(&lines).summary();
        let due = totals.grand_total;
        let now = Utc::now();
        TransactionRecord {
            transaction_number: "TXN-250301-143015-0042".into(),
            status: TransactionStatus::Completed,
            cart_items: lines,
            totals,
            customer: None,
            payment: Some(Payment {
                method,
                amount_tendered: Money::from_cents(tendered),
                change_due: Money::from_cents(tendered) - due,
                amount_paid: due,
                paid_at: now,
            }),
            loyalty: LoyaltySummary::default(),
            amount_due: due,
            created_at: now,
            completed_at: Some(now),
        }
    }

    #[test]
    fn test_cash_receipt() {
        let doc = project(&completed(PaymentMethod::Cash, 7000), &StoreConfig::default()).unwrap();

        assert_eq!(doc.lines.len(), 1);
        assert_eq!(doc.lines[0].line_total.cents(), 5998);
        assert_eq!(doc.lines[0].variant.as_deref(), Some("M / Blue"));
        assert_eq!(doc.lines[0].discount_percent, None);
        assert_eq!(doc.subtotal.cents(), 5998);
        assert_eq!(doc.total_tax.cents(), 510);
        assert_eq!(doc.grand_total.cents(), 6508);
        assert_eq!(doc.payment.change, Some(Money::from_cents(492)));
        assert_eq!(doc.discount, None);
        assert_eq!(doc.customer_name, None);
        assert_eq!(doc.points_earned, None);
    }

    #[test]
    fn test_card_receipt_has_no_change() {
        let doc = project(&completed(PaymentMethod::Card, 6508), &StoreConfig::default()).unwrap();
        assert_eq!(doc.payment.change, None);
        assert_eq!(doc.payment.tendered, None);
        assert_eq!(doc.payment.amount_paid.cents(), 6508);
    }

    #[test]
    fn test_customer_and_points_shown() {
        let mut record = completed(PaymentMethod::Cash, 7000);
        record.customer = Some(CustomerRef {
            id: "c-1".into(),
            name: "Ada Byron".into(),
            email: None,
        });
        record.loyalty.points_earned = 65;

        let doc = project(&record, &StoreConfig::default()).unwrap();
        assert_eq!(doc.customer_name.as_deref(), Some("Ada Byron"));
        assert_eq!(doc.points_earned, Some(65));
    }

    #[test]
    fn test_rejects_incomplete_record() {
        let mut record = completed(PaymentMethod::Cash, 7000);
        record.status = TransactionStatus::Voided;
        assert!(matches!(
            project(&record, &StoreConfig::default()),
            Err(CoreError::InvalidTransactionStatus { .. })
        ));

        let mut record = completed(PaymentMethod::Cash, 7000);
        record.payment = None;
        assert!(matches!(
            project(&record, &StoreConfig::default()),
            Err(CoreError::PaymentMissing(_))
        ));
    }

    #[test]
    fn test_render_text() {
        let store = StoreConfig {
            company_name: "Strata Outfitters".into(),
            address_lines: vec!["12 Market St".into()],
            phone: Some("555-0100".into()),
            ..StoreConfig::default()
        };
        let doc = project(&completed(PaymentMethod::Cash, 7000), &store).unwrap();
        let text = doc.render_text(40);

        assert!(text.iter().all(|l| l.chars().count() <= 40));
        assert_eq!(text[0].trim(), "Strata Outfitters");
        assert!(text.iter().any(|l| l.starts_with("2 x Shirt (M / Blue)") && l.ends_with("59.98")));
        assert!(text.iter().any(|l| l.starts_with("TOTAL") && l.ends_with("$65.08")));
        assert!(text.iter().any(|l| l.starts_with("Change") && l.ends_with("$4.92")));
        assert!(!text.iter().any(|l| l.starts_with("Discount")));
    }
}
