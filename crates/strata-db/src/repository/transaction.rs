//! # Transaction Repository
//!
//! Persistence for completed checkouts.
//!
//! ## Save Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    save_completed(record)                               │
//! │                                                                         │
//! │  number already stored? ── same sale ──► return existing id (no write)  │
//! │       │                 └─ other sale ─► DuplicateNumber                │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── INSERT transactions        (header, rounded totals, loyalty)      │
//! │   ├── INSERT transaction_items   (one per line, in cart order)          │
//! │   ├── INSERT payments            (exactly one)                          │
//! │   └── UPDATE product_variants    (quantity_on_hand -= qty)              │
//! │  COMMIT                                                                 │
//! │       │                                                                 │
//! │       └── UNIQUE(transaction_number) lost a race ──► same check again   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Either every row of a sale is written or none is; a failed save leaves
//! nothing behind to clean up before the retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::parse_decimal;
use crate::error::{DbError, DbResult};
use strata_core::{
    CartLine, CustomerRef, LoyaltySummary, Money, Payment, PaymentMethod, Percent, PortError,
    SavedTransaction, TaxAmount, TotalsSummary, TransactionRecord, TransactionStatus,
    TransactionStore,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct HeaderRow {
    id: String,
    transaction_number: String,
    status: TransactionStatus,
    subtotal_cents: i64,
    discount_cents: i64,
    tax_cents: i64,
    grand_total_cents: i64,
    tax_breakdown: String,
    loyalty_discount_cents: i64,
    points_earned: i64,
    points_redeemed: i64,
    loyalty_redeemed: bool,
    amount_due_cents: i64,
    customer_id: Option<String>,
    customer_name: Option<String>,
    customer_email: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    product_id: String,
    variant_id: String,
    name: String,
    size: Option<String>,
    color: Option<String>,
    quantity: i64,
    unit_price: String,
    discount_percent: String,
    tax_percent: String,
    category_id: Option<String>,
}

impl TryFrom<ItemRow> for CartLine {
    type Error = DbError;

    fn try_from(row: ItemRow) -> DbResult<Self> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| DbError::InvalidData(format!("quantity = {}", row.quantity)))?;

        Ok(CartLine {
            quantity,
            unit_price: parse_decimal("unit_price", &row.unit_price)?,
            discount_percent: Percent::new(parse_decimal("discount_percent", &row.discount_percent)?),
            tax_percent: Percent::new(parse_decimal("tax_percent", &row.tax_percent)?),
            id: row.id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            name: row.name,
            size: row.size,
            color: row.color,
            category_id: row.category_id,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    method: PaymentMethod,
    amount_tendered_cents: i64,
    change_due_cents: i64,
    amount_paid_cents: i64,
    paid_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            method: row.method,
            amount_tendered: Money::from_cents(row.amount_tendered_cents),
            change_due: Money::from_cents(row.change_due_cents),
            amount_paid: Money::from_cents(row.amount_paid_cents),
            paid_at: row.paid_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ListRow {
    transaction_number: String,
    status: TransactionStatus,
    amount_due_cents: i64,
    item_count: i64,
    customer_name: Option<String>,
    completed_at: Option<DateTime<Utc>>,
}

/// Row of the recent-transactions listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListItem {
    pub transaction_number: String,
    pub status: TransactionStatus,
    pub amount_due: Money,
    pub item_count: i64,
    pub customer_name: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ListRow> for TransactionListItem {
    fn from(row: ListRow) -> Self {
        TransactionListItem {
            transaction_number: row.transaction_number,
            status: row.status,
            amount_due: Money::from_cents(row.amount_due_cents),
            item_count: row.item_count,
            customer_name: row.customer_name,
            completed_at: row.completed_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for completed transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Persists a completed transaction with its lines and payment.
    ///
    /// ## Rules
    /// - Only `Completed` records with a payment and at least one line
    /// - Idempotent per `transaction_number`: saving the same sale again
    ///   returns the stored id
    /// - A number already stored for a different sale (other line ids or
    ///   amount due) fails with [`DbError::DuplicateNumber`]
    /// - Stock of each sold variant is decremented in the same SQL
    ///   transaction; variants missing from the catalog are skipped
    pub async fn save_completed(&self, record: &TransactionRecord) -> DbResult<SavedTransaction> {
        if record.status != TransactionStatus::Completed {
            return Err(DbError::InvalidData(format!(
                "{} is {}, only completed transactions are stored",
                record.transaction_number, record.status
            )));
        }
        let payment = record.payment.as_ref().ok_or_else(|| {
            DbError::InvalidData(format!("{} has no payment", record.transaction_number))
        })?;
        if record.cart_items.is_empty() {
            return Err(DbError::InvalidData(format!(
                "{} has no lines",
                record.transaction_number
            )));
        }

        if let Some(existing) = self.find_existing(record).await? {
            debug!(transaction = %record.transaction_number, "Transaction already saved");
            return Ok(existing);
        }

        let id = Uuid::new_v4().to_string();

        match self.write_completed(&id, record, payment).await {
            Ok(()) => {
                info!(
                    transaction = %record.transaction_number,
                    id = %id,
                    lines = record.cart_items.len(),
                    amount_due = %record.amount_due,
                    "Transaction saved"
                );
                Ok(SavedTransaction {
                    transaction_id: id,
                    transaction_number: record.transaction_number.clone(),
                })
            }
            Err(e) if e.is_unique_on("transactions.transaction_number") => {
                self.find_existing(record).await?.ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    /// The stored id when this very sale is already saved under its number.
    async fn find_existing(&self, record: &TransactionRecord) -> DbResult<Option<SavedTransaction>> {
        let stored: Option<(String, i64)> = sqlx::query_as(
            "SELECT id, amount_due_cents FROM transactions WHERE transaction_number = ?1",
        )
        .bind(&record.transaction_number)
        .fetch_optional(&self.pool)
        .await?;

        let Some((transaction_id, amount_due_cents)) = stored else {
            return Ok(None);
        };

        let line_ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM transaction_items WHERE transaction_id = ?1 ORDER BY position",
        )
        .bind(&transaction_id)
        .fetch_all(&self.pool)
        .await?;

        let same_sale = amount_due_cents == record.amount_due.cents()
            && line_ids.iter().eq(record.cart_items.iter().map(|line| &line.id));
        if !same_sale {
            warn!(
                transaction = %record.transaction_number,
                stored_id = %transaction_id,
                "Transaction number already used by a different sale"
            );
            return Err(DbError::DuplicateNumber(record.transaction_number.clone()));
        }

        Ok(Some(SavedTransaction {
            transaction_id,
            transaction_number: record.transaction_number.clone(),
        }))
    }

    async fn write_completed(
        &self,
        id: &str,
        record: &TransactionRecord,
        payment: &Payment,
    ) -> DbResult<()> {
        let tax_breakdown = serde_json::to_string(&record.totals.tax_breakdown)
            .map_err(|e| DbError::InvalidData(format!("tax breakdown: {}", e)))?;
        let customer = record.customer.as_ref();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, transaction_number, status,
                subtotal_cents, discount_cents, tax_cents, grand_total_cents, tax_breakdown,
                loyalty_discount_cents, points_earned, points_redeemed, loyalty_redeemed,
                amount_due_cents, customer_id, customer_name, customer_email,
                created_at, completed_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18
            )
            "#,
        )
        .bind(id)
        .bind(&record.transaction_number)
        .bind(record.status)
        .bind(record.totals.subtotal.cents())
        .bind(record.totals.total_discount.cents())
        .bind(record.totals.total_tax.cents())
        .bind(record.totals.grand_total.cents())
        .bind(tax_breakdown)
        .bind(record.loyalty.loyalty_discount.cents())
        .bind(record.loyalty.points_earned)
        .bind(record.loyalty.points_redeemed)
        .bind(record.loyalty.redeemed)
        .bind(record.amount_due.cents())
        .bind(customer.map(|c| c.id.as_str()))
        .bind(customer.map(|c| c.name.as_str()))
        .bind(customer.and_then(|c| c.email.as_deref()))
        .bind(record.created_at)
        .bind(record.completed_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in record.cart_items.iter().enumerate() {
            insert_item(&mut tx, id, position as i64, line).await?;
            decrement_stock(&mut tx, &line.variant_id, i64::from(line.quantity)).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, transaction_id, method,
                amount_tendered_cents, change_due_cents, amount_paid_cents, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .bind(payment.method)
        .bind(payment.amount_tendered.cents())
        .bind(payment.change_due.cents())
        .bind(payment.amount_paid.cents())
        .bind(payment.paid_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Loads a stored transaction with its lines and payment.
    pub async fn get_by_number(&self, transaction_number: &str) -> DbResult<Option<TransactionRecord>> {
        let header: Option<HeaderRow> = sqlx::query_as(
            r#"
            SELECT
                id, transaction_number, status,
                subtotal_cents, discount_cents, tax_cents, grand_total_cents, tax_breakdown,
                loyalty_discount_cents, points_earned, points_redeemed, loyalty_redeemed,
                amount_due_cents, customer_id, customer_name, customer_email,
                created_at, completed_at
            FROM transactions
            WHERE transaction_number = ?1
            "#,
        )
        .bind(transaction_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let items: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT
                id, product_id, variant_id, name, size, color, quantity,
                unit_price, discount_percent, tax_percent, category_id
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&header.id)
        .fetch_all(&self.pool)
        .await?;

        let payment: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT method, amount_tendered_cents, change_due_cents, amount_paid_cents, paid_at
            FROM payments
            WHERE transaction_id = ?1
            "#,
        )
        .bind(&header.id)
        .fetch_optional(&self.pool)
        .await?;

        let cart_items = items
            .into_iter()
            .map(CartLine::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        let tax_breakdown: Vec<TaxAmount> = serde_json::from_str(&header.tax_breakdown)
            .map_err(|e| DbError::InvalidData(format!("tax_breakdown: {}", e)))?;

        let customer = header.customer_id.map(|id| CustomerRef {
            id,
            name: header.customer_name.unwrap_or_default(),
            email: header.customer_email,
        });

        Ok(Some(TransactionRecord {
            transaction_number: header.transaction_number,
            status: header.status,
            cart_items,
            totals: TotalsSummary {
                subtotal: Money::from_cents(header.subtotal_cents),
                total_discount: Money::from_cents(header.discount_cents),
                tax_breakdown,
                total_tax: Money::from_cents(header.tax_cents),
                grand_total: Money::from_cents(header.grand_total_cents),
            },
            customer,
            payment: payment.map(Payment::from),
            loyalty: LoyaltySummary {
                points_earned: header.points_earned,
                points_redeemed: header.points_redeemed,
                loyalty_discount: Money::from_cents(header.loyalty_discount_cents),
                redeemed: header.loyalty_redeemed,
            },
            amount_due: Money::from_cents(header.amount_due_cents),
            created_at: header.created_at,
            completed_at: header.completed_at,
        }))
    }

    /// Most recently completed transactions first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<TransactionListItem>> {
        let rows: Vec<ListRow> = sqlx::query_as(
            r#"
            SELECT
                t.transaction_number,
                t.status,
                t.amount_due_cents,
                (SELECT COALESCE(SUM(i.quantity), 0)
                   FROM transaction_items i
                  WHERE i.transaction_id = t.id) AS item_count,
                t.customer_name,
                t.completed_at
            FROM transactions t
            ORDER BY t.completed_at DESC, t.transaction_number DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TransactionListItem::from).collect())
    }

    /// Counts stored transactions (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn insert_item(
    tx: &mut Transaction<'_, Sqlite>,
    transaction_id: &str,
    position: i64,
    line: &CartLine,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, position, product_id, variant_id, name, size, color,
            quantity, unit_price, discount_percent, tax_percent, category_id, line_total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&line.id)
    .bind(transaction_id)
    .bind(position)
    .bind(&line.product_id)
    .bind(&line.variant_id)
    .bind(&line.name)
    .bind(&line.size)
    .bind(&line.color)
    .bind(i64::from(line.quantity))
    .bind(line.unit_price.to_string())
    .bind(line.discount_percent.value().to_string())
    .bind(line.tax_percent.value().to_string())
    .bind(&line.category_id)
    .bind(Money::from_decimal(line.net()).cents())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn decrement_stock(
    tx: &mut Transaction<'_, Sqlite>,
    variant_id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE product_variants
        SET quantity_on_hand = quantity_on_hand - ?2,
            updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(variant_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        debug!(variant = %variant_id, "Sold variant not in catalog, stock untouched");
    }

    Ok(())
}

#[async_trait]
impl TransactionStore for TransactionRepository {
    async fn save(&self, record: &TransactionRecord) -> Result<SavedTransaction, PortError> {
        Ok(self.save_completed(record).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
