//! # Catalog Repository
//!
//! Sellable product variants and their stock.
//!
//! ## Lookup
//! ```text
//! scan "5449000000996" ──► CatalogLookup::Barcode ──► WHERE barcode = ?
//! type "TS-M-BLU"      ──► CatalogLookup::Sku     ──► WHERE sku = ?
//! tap a tile           ──► CatalogLookup::VariantId ► WHERE id = ?
//! ```
//!
//! Inactive variants are invisible to lookups. Stock is decremented by
//! [`TransactionRepository`](super::transaction::TransactionRepository) when a
//! sale is saved.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::parse_decimal;
use crate::error::{DbError, DbResult};
use strata_core::{CatalogItem, CatalogLookup, Percent, PortError, ProductCatalog};

const VARIANT_COLUMNS: &str = r#"
    id, product_id, sku, barcode, name, size, color,
    unit_price, tax_percent, category_id,
    quantity_on_hand, allow_negative_stock
"#;

#[derive(Debug, FromRow)]
struct VariantRow {
    id: String,
    product_id: String,
    sku: String,
    barcode: Option<String>,
    name: String,
    size: Option<String>,
    color: Option<String>,
    unit_price: String,
    tax_percent: String,
    category_id: Option<String>,
    quantity_on_hand: i64,
    allow_negative_stock: bool,
}

impl TryFrom<VariantRow> for CatalogItem {
    type Error = DbError;

    fn try_from(row: VariantRow) -> DbResult<Self> {
        Ok(CatalogItem {
            unit_price: parse_decimal("unit_price", &row.unit_price)?,
            tax_percent: Percent::new(parse_decimal("tax_percent", &row.tax_percent)?),
            product_id: row.product_id,
            variant_id: row.id,
            sku: row.sku,
            barcode: row.barcode,
            name: row.name,
            size: row.size,
            color: row.color,
            category_id: row.category_id,
            quantity_on_hand: row.quantity_on_hand,
            allow_negative_stock: row.allow_negative_stock,
        })
    }
}

/// Repository for product variants.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Finds an active variant by id, SKU or barcode.
    pub async fn find(&self, lookup: &CatalogLookup) -> DbResult<Option<CatalogItem>> {
        let (column, value) = match lookup {
            CatalogLookup::VariantId(v) => ("id", v),
            CatalogLookup::Sku(v) => ("sku", v),
            CatalogLookup::Barcode(v) => ("barcode", v),
        };

        debug!(%lookup, "Looking up catalog variant");

        let sql = format!(
            "SELECT {} FROM product_variants WHERE {} = ?1 AND is_active = 1",
            VARIANT_COLUMNS, column
        );

        let row: Option<VariantRow> = sqlx::query_as(&sql)
            .bind(value.trim())
            .fetch_optional(&self.pool)
            .await?;

        row.map(CatalogItem::try_from).transpose()
    }

    /// Inserts a variant as active.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU or barcode already exists
    pub async fn insert(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(sku = %item.sku, "Inserting catalog variant");

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO product_variants (
                id, product_id, sku, barcode, name, size, color,
                unit_price, tax_percent, category_id,
                quantity_on_hand, allow_negative_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13, ?13)
            "#,
        )
        .bind(&item.variant_id)
        .bind(&item.product_id)
        .bind(&item.sku)
        .bind(&item.barcode)
        .bind(&item.name)
        .bind(&item.size)
        .bind(&item.color)
        .bind(item.unit_price.to_string())
        .bind(item.tax_percent.value().to_string())
        .bind(&item.category_id)
        .bind(item.quantity_on_hand)
        .bind(item.allow_negative_stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Hides a variant from lookups. Past sales keep their snapshot.
    pub async fn deactivate(&self, variant_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE product_variants SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(variant_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", variant_id));
        }

        Ok(())
    }

    /// Current on-hand quantity, `None` for an unknown variant.
    pub async fn stock_level(&self, variant_id: &str) -> DbResult<Option<i64>> {
        let level = sqlx::query_scalar("SELECT quantity_on_hand FROM product_variants WHERE id = ?1")
            .bind(variant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(level)
    }

    /// Counts active variants.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_variants WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl ProductCatalog for CatalogRepository {
    async fn find_variant(&self, lookup: &CatalogLookup) -> Result<Option<CatalogItem>, PortError> {
        Ok(self.find(lookup).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use rust_decimal::Decimal;

    fn shirt(variant_id: &str, sku: &str, size: &str) -> CatalogItem {
        CatalogItem {
            product_id: "p-tshirt".to_string(),
            variant_id: variant_id.to_string(),
            sku: sku.to_string(),
            barcode: Some(format!("BC-{}", sku)),
            name: "Crew Tee".to_string(),
            size: Some(size.to_string()),
            color: Some("Blue".to_string()),
            unit_price: Decimal::new(2999, 2),
            tax_percent: Percent::new(Decimal::new(85, 1)),
            category_id: Some("tops".to_string()),
            quantity_on_hand: 10,
            allow_negative_stock: false,
        }
    }

    async fn setup() -> CatalogRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
    }

    #[tokio::test]
    async fn test_find_by_each_key() {
        let repo = setup().await;
        let item = shirt("v-m", "TEE-M", "M");
        repo.insert(&item).await.unwrap();

        let by_id = repo.find(&CatalogLookup::VariantId("v-m".into())).await.unwrap();
        let by_sku = repo.find(&CatalogLookup::Sku("TEE-M".into())).await.unwrap();
        let by_barcode = repo
            .find(&CatalogLookup::Barcode(item.barcode.clone().unwrap()))
            .await
            .unwrap();

        assert_eq!(by_id.as_ref(), Some(&item));
        assert_eq!(by_sku.as_ref(), Some(&item));
        assert_eq!(by_barcode.as_ref(), Some(&item));
        assert!(repo.find(&CatalogLookup::Sku("NOPE".into())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decimal_columns_keep_exact_values() {
        let repo = setup().await;
        let mut item = shirt("v-odd", "TEE-ODD", "L");
        item.barcode = None;
        item.unit_price = Decimal::new(12345, 3);
        item.tax_percent = Percent::new(Decimal::new(7125, 3));
        repo.insert(&item).await.unwrap();

        let found = repo.find(&CatalogLookup::VariantId("v-odd".into())).await.unwrap().unwrap();
        assert_eq!(found.unit_price, Decimal::new(12345, 3));
        assert_eq!(found.tax_percent, Percent::new(Decimal::new(7125, 3)));
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let repo = setup().await;
        repo.insert(&shirt("v-1", "TEE-DUP", "M")).await.unwrap();

        let mut again = shirt("v-2", "TEE-DUP", "L");
        again.barcode = None;
        let err = repo.insert(&again).await.unwrap_err();
        assert!(err.is_unique_on("product_variants.sku"));
    }

    #[tokio::test]
    async fn test_inactive_variant_not_found() {
        let repo = setup().await;
        repo.insert(&shirt("v-old", "TEE-OLD", "S")).await.unwrap();
        repo.deactivate("v-old").await.unwrap();

        assert!(repo.find(&CatalogLookup::VariantId("v-old".into())).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.stock_level("v-old").await.unwrap(), Some(10));
        assert!(matches!(
            repo.deactivate("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_port_lookup() {
        let repo = setup().await;
        repo.insert(&shirt("v-m", "TEE-M", "M")).await.unwrap();

        let catalog: &dyn ProductCatalog = &repo;
        let found = catalog.find_variant(&CatalogLookup::Sku("TEE-M".into())).await.unwrap();
        assert_eq!(found.map(|i| i.variant_id), Some("v-m".to_string()));
    }
}
