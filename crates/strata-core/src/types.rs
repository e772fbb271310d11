//! # Domain Types
//!
//! Core domain types of the checkout engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartLine     │   │ TransactionRec. │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  number         │   │  method         │       │
//! │  │  product/variant│   │  status         │   │  tendered       │       │
//! │  │  qty, price     │   │  cart_items     │   │  change_due     │       │
//! │  │  discount%, tax%│   │  totals, loyalty│   │  amount_paid    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Percent      │   │TransactionStatus│   │   VoidReason    │       │
//! │  │  8.5 = 8.5%     │   │  Active, Held   │   │  fixed set +    │       │
//! │  │  (Decimal)      │   │  Voided, Compl. │   │  Other(text)    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart lines carry snapshot data (name, price, tax) frozen when the line was
//! added; later catalog changes do not move an open transaction's totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage stored as its human value: `8.5` means 8.5%.
///
/// Used for both line discounts (0–100) and tax rates (≥ 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    /// Wraps a percentage value.
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Percent(value)
    }

    /// Creates a percentage from basis points (850 bps = 8.5%).
    #[inline]
    pub fn from_bps(bps: u32) -> Self {
        Percent(Decimal::new(bps as i64, 2))
    }

    /// Returns the percentage value (8.5 for 8.5%).
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Returns the rate in basis points, truncating anything finer.
    pub fn bps(&self) -> u32 {
        use rust_decimal::prelude::ToPrimitive;
        (self.0 * Decimal::ONE_HUNDRED).trunc().to_u32().unwrap_or(0)
    }

    /// Applies the percentage to an amount, without rounding.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use strata_core::types::Percent;
    ///
    /// let rate = Percent::new(Decimal::new(85, 1)); // 8.5%
    /// assert_eq!(rate.of(Decimal::from(18)), Decimal::new(153, 2));
    /// ```
    #[inline]
    pub fn of(&self, amount: Decimal) -> Decimal {
        amount * self.0 / Decimal::ONE_HUNDRED
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One product variant in the active transaction.
///
/// ## Invariants
/// - `quantity >= 1`
/// - At most one line per `(product_id, size, color)` in a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Stable line identifier (UUID v4), survives quantity edits.
    pub id: String,
    pub product_id: String,
    pub variant_id: String,
    pub name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    #[ts(type = "string")]
    pub unit_price: Decimal,
    #[ts(type = "string")]
    pub discount_percent: Percent,
    #[ts(type = "string")]
    pub tax_percent: Percent,
    pub category_id: Option<String>,
}

impl CartLine {
    /// Creates a line from an add request with a fresh line id.
    pub fn from_new(new: &NewLine, quantity: u32) -> Self {
        CartLine {
            id: Uuid::new_v4().to_string(),
            product_id: new.product_id.clone(),
            variant_id: new.variant_id.clone(),
            name: new.name.clone(),
            size: new.size.clone(),
            color: new.color.clone(),
            quantity,
            unit_price: new.unit_price,
            discount_percent: new.discount_percent,
            tax_percent: new.tax_percent,
            category_id: new.category_id.clone(),
        }
    }

    /// True when `new` describes the same product, size and color.
    pub fn merges_with(&self, new: &NewLine) -> bool {
        self.product_id == new.product_id && self.size == new.size && self.color == new.color
    }

    /// `unit_price × quantity`
    #[inline]
    pub fn gross(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Discount on the gross amount.
    #[inline]
    pub fn discount_amount(&self) -> Decimal {
        self.discount_percent.of(self.gross())
    }

    /// Gross minus discount.
    #[inline]
    pub fn net(&self) -> Decimal {
        self.gross() - self.discount_amount()
    }

    /// Tax on the discounted amount.
    #[inline]
    pub fn tax_amount(&self) -> Decimal {
        self.tax_percent.of(self.net())
    }

    /// `"M / Blue"` style variant label, if the line has size or color.
    pub fn variant_label(&self) -> Option<String> {
        match (&self.size, &self.color) {
            (Some(size), Some(color)) => Some(format!("{} / {}", size, color)),
            (Some(one), None) | (None, Some(one)) => Some(one.clone()),
            (None, None) => None,
        }
    }
}

/// Request to add a product variant to the cart.
///
/// `quantity: None` means one unit, both for a fresh line and for a merge.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewLine {
    pub product_id: String,
    pub variant_id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[ts(type = "string")]
    pub unit_price: Decimal,
    #[serde(default)]
    #[ts(type = "string")]
    pub discount_percent: Percent,
    #[serde(default)]
    #[ts(type = "string")]
    pub tax_percent: Percent,
    #[serde(default)]
    pub category_id: Option<String>,
}

impl NewLine {
    /// Builds an add request from a catalog entry.
    pub fn from_catalog(item: &CatalogItem, quantity: Option<u32>) -> Self {
        NewLine {
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            name: item.name.clone(),
            size: item.size.clone(),
            color: item.color.clone(),
            quantity,
            unit_price: item.unit_price,
            discount_percent: Percent::zero(),
            tax_percent: item.tax_percent,
            category_id: item.category_id.clone(),
        }
    }
}

/// Partial update to a line. Absent fields are left unchanged.
///
/// Quantity patches below 1 clamp to 1; removal is `void_item`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LinePatch {
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub discount_percent: Option<Percent>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub unit_price: Option<Decimal>,
}

// =============================================================================
// Totals
// =============================================================================

/// Tax collected at one rate, working precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxLine {
    #[ts(type = "string")]
    pub rate: Percent,
    #[ts(type = "string")]
    pub amount: Decimal,
}

/// Totals derived from a line list, working precision (unrounded).
///
/// ## Invariant
/// `grand_total == subtotal - total_discount + total_tax`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    #[ts(type = "string")]
    pub subtotal: Decimal,
    #[ts(type = "string")]
    pub total_discount: Decimal,
    /// One entry per distinct rate, in first-seen line order.
    pub tax_breakdown: Vec<TaxLine>,
    #[ts(type = "string")]
    pub total_tax: Decimal,
    #[ts(type = "string")]
    pub grand_total: Decimal,
}

impl Totals {
    /// Rounds every figure to cents for display or persistence.
    pub fn summary(&self) -> TotalsSummary {
        TotalsSummary {
            subtotal: Money::from_decimal(self.subtotal),
            total_discount: Money::from_decimal(self.total_discount),
            tax_breakdown: self
                .tax_breakdown
                .iter()
                .map(|t| TaxAmount {
                    rate: t.rate,
                    amount: Money::from_decimal(t.amount),
                })
                .collect(),
            total_tax: Money::from_decimal(self.total_tax),
            grand_total: Money::from_decimal(self.grand_total),
        }
    }
}

/// Tax collected at one rate, rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxAmount {
    #[ts(type = "string")]
    pub rate: Percent,
    pub amount: Money,
}

/// Totals rounded to cents, as persisted and printed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TotalsSummary {
    pub subtotal: Money,
    pub total_discount: Money,
    pub tax_breakdown: Vec<TaxAmount>,
    pub total_tax: Money,
    pub grand_total: Money,
}

// =============================================================================
// Customer
// =============================================================================

/// Customer record as served by the customer/loyalty store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// Spendable point balance.
    pub loyalty_points: i64,
    /// Program or tier name, if enrolled.
    pub loyalty_program: Option<String>,
}

impl Customer {
    /// `"First Last"`, trimmed when one part is empty.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Denormalized customer reference stored on a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

impl From<&Customer> for CustomerRef {
    fn from(customer: &Customer) -> Self {
        CustomerRef {
            id: customer.id.clone(),
            name: customer.display_name(),
            email: customer.email.clone(),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A sellable product variant as served by the product/stock catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub product_id: String,
    pub variant_id: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    #[ts(type = "string")]
    pub unit_price: Decimal,
    #[ts(type = "string")]
    pub tax_percent: Percent,
    pub category_id: Option<String>,
    pub quantity_on_hand: i64,
    /// Allow selling past zero stock.
    pub allow_negative_stock: bool,
}

impl CatalogItem {
    /// Checks if `quantity` units can be sold.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.allow_negative_stock || self.quantity_on_hand >= quantity
    }
}

/// How a catalog entry is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum CatalogLookup {
    VariantId(String),
    Sku(String),
    Barcode(String),
}

impl fmt::Display for CatalogLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogLookup::VariantId(v) => write!(f, "variant {}", v),
            CatalogLookup::Sku(v) => write!(f, "sku {}", v),
            CatalogLookup::Barcode(v) => write!(f, "barcode {}", v),
        }
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Where a transaction is in its lifecycle.
///
/// ```text
///            hold              retrieve
///  Active ──────────► Held ──────────► Active
///    │
///    ├── void ──────► Voided      (terminal)
///    └── complete ──► Completed   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Active,
    Held,
    Voided,
    Completed,
}

impl TransactionStatus {
    /// Voided and completed transactions accept no further operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Voided | TransactionStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Held => "held",
            TransactionStatus::Voided => "voided",
            TransactionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Other => "Other",
        }
    }
}

/// Payment captured against a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: PaymentMethod,
    /// What the customer handed over.
    pub amount_tendered: Money,
    /// `amount_tendered - amount_paid`
    pub change_due: Money,
    /// Amount due at capture time.
    pub amount_paid: Money,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Void Reason
// =============================================================================

/// Why a line or a whole transaction was voided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum VoidReason {
    CustomerRequest,
    PriceDispute,
    ScanError,
    DamagedItem,
    TestTransaction,
    /// Free text; must not be blank.
    Other(String),
}

impl fmt::Display for VoidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoidReason::CustomerRequest => f.write_str("Customer request"),
            VoidReason::PriceDispute => f.write_str("Price dispute"),
            VoidReason::ScanError => f.write_str("Scan error"),
            VoidReason::DamagedItem => f.write_str("Damaged item"),
            VoidReason::TestTransaction => f.write_str("Test transaction"),
            VoidReason::Other(text) => write!(f, "Other: {}", text.trim()),
        }
    }
}

// =============================================================================
// Loyalty Summary
// =============================================================================

/// Loyalty effects recorded on a transaction (committed values).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltySummary {
    pub points_earned: i64,
    pub points_redeemed: i64,
    pub loyalty_discount: Money,
    pub redeemed: bool,
}

// =============================================================================
// Transaction Record
// =============================================================================

/// The unit of record for one checkout, as handed to persistence.
///
/// ## Invariants
/// - `payment.is_some()` iff `status == Completed`
/// - `cart_items` is non-empty for `Completed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_number: String,
    pub status: TransactionStatus,
    pub cart_items: Vec<CartLine>,
    pub totals: TotalsSummary,
    pub customer: Option<CustomerRef>,
    pub payment: Option<Payment>,
    pub loyalty: LoyaltySummary,
    /// Grand total minus loyalty discount.
    pub amount_due: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// Total units across lines.
    pub fn item_count(&self) -> u32 {
        self.cart_items.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Held Transaction
// =============================================================================

/// A parked transaction awaiting retrieval, keyed by `park_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HeldTransaction {
    pub park_code: String,
    pub transaction_number: String,
    pub reason: Option<String>,
    /// Subtotal at the time of parking.
    #[ts(type = "string")]
    pub subtotal: Decimal,
    pub cart_items: Vec<CartLine>,
    pub customer: Option<Customer>,
    pub redeem_loyalty: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub held_at: DateTime<Utc>,
}

/// Listing entry for the retrieve flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HeldSummary {
    pub park_code: String,
    pub transaction_number: String,
    pub reason: Option<String>,
    pub subtotal: Money,
    pub line_count: usize,
    pub customer_name: Option<String>,
    #[ts(as = "String")]
    pub held_at: DateTime<Utc>,
}

impl From<&HeldTransaction> for HeldSummary {
    fn from(held: &HeldTransaction) -> Self {
        HeldSummary {
            park_code: held.park_code.clone(),
            transaction_number: held.transaction_number.clone(),
            reason: held.reason.clone(),
            subtotal: Money::from_decimal(held.subtotal),
            line_count: held.cart_items.len(),
            customer_name: held.customer.as_ref().map(Customer::display_name),
            held_at: held.held_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> NewLine {
        NewLine {
            product_id: "p-shirt".to_string(),
            variant_id: "v-shirt-m-blue".to_string(),
            name: "Shirt".to_string(),
            size: Some("M".to_string()),
            color: Some("Blue".to_string()),
            quantity: None,
            unit_price: Decimal::new(2999, 2),
            discount_percent: Percent::zero(),
            tax_percent: Percent::new(Decimal::new(85, 1)),
            category_id: None,
        }
    }

    #[test]
    fn test_percent_from_bps() {
        let rate = Percent::from_bps(850);
        assert_eq!(rate.value(), Decimal::new(85, 1));
        assert_eq!(rate.bps(), 850);
        assert_eq!(rate.to_string(), "8.5%");
    }

    #[test]
    fn test_line_amounts() {
        let mut line = CartLine::from_new(&shirt(), 2);
        line.unit_price = Decimal::from(10);
        line.discount_percent = Percent::new(Decimal::from(10));

        assert_eq!(line.gross(), Decimal::from(20));
        assert_eq!(line.discount_amount(), Decimal::from(2));
        assert_eq!(line.net(), Decimal::from(18));
        assert_eq!(line.tax_amount(), Decimal::new(153, 2));
    }

    #[test]
    fn test_merge_key_ignores_variant_id_and_price() {
        let line = CartLine::from_new(&shirt(), 1);

        let mut same = shirt();
        same.variant_id = "other-variant".to_string();
        same.unit_price = Decimal::from(1);
        assert!(line.merges_with(&same));

        let mut other_color = shirt();
        other_color.color = Some("Red".to_string());
        assert!(!line.merges_with(&other_color));
    }

    #[test]
    fn test_variant_label() {
        let mut line = CartLine::from_new(&shirt(), 1);
        assert_eq!(line.variant_label().as_deref(), Some("M / Blue"));
        line.color = None;
        assert_eq!(line.variant_label().as_deref(), Some("M"));
        line.size = None;
        assert_eq!(line.variant_label(), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TransactionStatus::Active.is_terminal());
        assert!(!TransactionStatus::Held.is_terminal());
        assert!(TransactionStatus::Voided.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
        assert_eq!(TransactionStatus::default(), TransactionStatus::Active);
    }

    #[test]
    fn test_void_reason_wire_format() {
        let json = serde_json::to_string(&VoidReason::Other("wrong size".into())).unwrap();
        assert_eq!(json, r#"{"kind":"other","text":"wrong size"}"#);

        let parsed: VoidReason = serde_json::from_str(r#"{"kind":"scan_error"}"#).unwrap();
        assert_eq!(parsed, VoidReason::ScanError);
    }

    #[test]
    fn test_catalog_can_sell() {
        let mut item = CatalogItem {
            product_id: "p".into(),
            variant_id: "v".into(),
            sku: "SKU".into(),
            barcode: None,
            name: "Thing".into(),
            size: None,
            color: None,
            unit_price: Decimal::ONE,
            tax_percent: Percent::zero(),
            category_id: None,
            quantity_on_hand: 2,
            allow_negative_stock: false,
        };
        assert!(item.can_sell(2));
        assert!(!item.can_sell(3));
        item.allow_negative_stock = true;
        assert!(item.can_sell(3));
    }
}
