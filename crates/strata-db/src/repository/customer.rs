//! # Customer Repository
//!
//! Customer records and loyalty point balances.
//!
//! ## Point Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 commit_points(TXN-…, redeem 500, earn 65)               │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── loyalty_history has TXN-…?  ── same ──► return current balance    │
//! │   │                                  └─ other ─► DuplicateNumber        │
//! │   ├── UPDATE customers                                                  │
//! │   │     SET loyalty_points = loyalty_points - 500 + 65                  │
//! │   │     WHERE id = ? AND loyalty_points >= 500                          │
//! │   │       └── 0 rows ──► NotFound / Conflict (balance spent elsewhere)  │
//! │   └── INSERT loyalty_history (TXN-…, 500, 65, balance_after)           │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use strata_core::{Customer, CustomerDirectory, LoyaltyCommit, LoyaltyLedger, PortError};

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    loyalty_points: i64,
    loyalty_program: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            loyalty_points: row.loyalty_points,
            loyalty_program: row.loyalty_program,
        }
    }
}

/// One committed point movement.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyHistoryEntry {
    pub transaction_number: String,
    pub points_redeemed: i64,
    pub points_earned: i64,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

/// Repository for customers and their loyalty ledger.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Customer))` - Customer found
    /// * `Ok(None)` - No such customer
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, email, loyalty_points, loyalty_program
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Inserts a customer with their opening balance.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, first_name, last_name, email,
                loyalty_points, loyalty_program, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(customer.loyalty_points)
        .bind(&customer.loyalty_program)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Debits redeemed and credits earned points for one transaction.
    ///
    /// ## Rules
    /// - A transaction number is committed at most once; repeats return the
    ///   current balance unchanged
    /// - A repeat that moves different points, or belongs to another
    ///   customer, fails with [`DbError::DuplicateNumber`]
    /// - The balance never goes below zero: a debit larger than the balance
    ///   fails with [`DbError::Conflict`] and nothing is written
    ///
    /// ## Returns
    /// The balance after the commit.
    pub async fn commit_points(&self, commit: &LoyaltyCommit) -> DbResult<i64> {
        if commit.points_redeemed < 0 || commit.points_earned < 0 {
            return Err(DbError::InvalidData(format!(
                "negative point movement for {}",
                commit.transaction_number
            )));
        }

        match self.write_commit(commit).await {
            Ok(balance) => Ok(balance),
            // Lost a race with a concurrent commit of the same number
            Err(e) if e.is_unique_on("loyalty_history.transaction_number") => {
                let recorded = recorded_commit(&self.pool, &commit.transaction_number).await?;
                ensure_same_commit(recorded.as_ref(), commit)?;
                debug!(transaction = %commit.transaction_number, "Points already committed");
                self.balance(&commit.customer_id).await
            }
            Err(e) => Err(e),
        }
    }

    async fn write_commit(&self, commit: &LoyaltyCommit) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let recorded = recorded_commit(&mut *tx, &commit.transaction_number).await?;

        if recorded.is_some() {
            tx.commit().await?;
            ensure_same_commit(recorded.as_ref(), commit)?;
            debug!(transaction = %commit.transaction_number, "Points already committed");
            return self.balance(&commit.customer_id).await;
        }

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET loyalty_points = loyalty_points - ?2 + ?3,
                updated_at = ?4
            WHERE id = ?1 AND loyalty_points >= ?2
            "#,
        )
        .bind(&commit.customer_id)
        .bind(commit.points_redeemed)
        .bind(commit.points_earned)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT loyalty_points FROM customers WHERE id = ?1")
                    .bind(&commit.customer_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match exists {
                None => DbError::not_found("Customer", &commit.customer_id),
                Some(balance) => DbError::Conflict(format!(
                    "cannot redeem {} points from a balance of {}",
                    commit.points_redeemed, balance
                )),
            });
        }

        let balance_after: i64 =
            sqlx::query_scalar("SELECT loyalty_points FROM customers WHERE id = ?1")
                .bind(&commit.customer_id)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO loyalty_history (
                id, customer_id, transaction_number,
                points_redeemed, points_earned, balance_after, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&commit.customer_id)
        .bind(&commit.transaction_number)
        .bind(commit.points_redeemed)
        .bind(commit.points_earned)
        .bind(balance_after)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            customer = %commit.customer_id,
            transaction = %commit.transaction_number,
            redeemed = commit.points_redeemed,
            earned = commit.points_earned,
            balance = balance_after,
            "Loyalty points committed"
        );

        Ok(balance_after)
    }

    async fn balance(&self, customer_id: &str) -> DbResult<i64> {
        sqlx::query_scalar("SELECT loyalty_points FROM customers WHERE id = ?1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))
    }

    /// Point movements for a customer, newest first.
    pub async fn history(&self, customer_id: &str) -> DbResult<Vec<LoyaltyHistoryEntry>> {
        let entries = sqlx::query_as(
            r#"
            SELECT transaction_number, points_redeemed, points_earned, balance_after, created_at
            FROM loyalty_history
            WHERE customer_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// The movement already stored under a transaction number.
#[derive(Debug, FromRow)]
struct RecordedCommit {
    customer_id: String,
    points_redeemed: i64,
    points_earned: i64,
}

async fn recorded_commit<'e, E>(executor: E, transaction_number: &str) -> DbResult<Option<RecordedCommit>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let recorded = sqlx::query_as(
        r#"
        SELECT customer_id, points_redeemed, points_earned
        FROM loyalty_history
        WHERE transaction_number = ?1
        "#,
    )
    .bind(transaction_number)
    .fetch_optional(executor)
    .await?;

    Ok(recorded)
}

fn ensure_same_commit(recorded: Option<&RecordedCommit>, commit: &LoyaltyCommit) -> DbResult<()> {
    match recorded {
        Some(r)
            if r.customer_id != commit.customer_id
                || r.points_redeemed != commit.points_redeemed
                || r.points_earned != commit.points_earned =>
        {
            warn!(
                transaction = %commit.transaction_number,
                customer = %r.customer_id,
                "Transaction number already used by a different point movement"
            );
            Err(DbError::DuplicateNumber(commit.transaction_number.clone()))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl CustomerDirectory for CustomerRepository {
    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, PortError> {
        Ok(self.get_by_id(customer_id).await?)
    }
}

#[async_trait]
impl LoyaltyLedger for CustomerRepository {
    async fn commit_points(&self, commit: &LoyaltyCommit) -> Result<i64, PortError> {
        Ok(CustomerRepository::commit_points(self, commit).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn alice(points: i64) -> Customer {
        Customer {
            id: "c-alice".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Ng".to_string(),
            email: Some("alice@example.com".to_string()),
            loyalty_points: points,
            loyalty_program: Some("Gold".to_string()),
        }
    }

    fn commit(number: &str, redeemed: i64, earned: i64) -> LoyaltyCommit {
        LoyaltyCommit {
            customer_id: "c-alice".to_string(),
            transaction_number: number.to_string(),
            points_redeemed: redeemed,
            points_earned: earned,
        }
    }

    async fn setup(points: i64) -> CustomerRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();
        repo.insert(&alice(points)).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let repo = setup(120).await;

        assert_eq!(repo.get_by_id("c-alice").await.unwrap(), Some(alice(120)));
        assert_eq!(repo.get_by_id("c-nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_commit_moves_balance_once() {
        let repo = setup(1000).await;

        let balance = repo.commit_points(&commit("TXN-1", 500, 65)).await.unwrap();
        assert_eq!(balance, 565);

        // Retried completion: same number, no second movement
        let again = repo.commit_points(&commit("TXN-1", 500, 65)).await.unwrap();
        assert_eq!(again, 565);

        let history = repo.history("c-alice").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].balance_after, 565);
    }

    #[tokio::test]
    async fn test_reused_number_for_other_movement_refused() {
        let repo = setup(1000).await;
        repo.commit_points(&commit("TXN-1", 500, 65)).await.unwrap();

        // Another sale carrying the same number
        let err = repo.commit_points(&commit("TXN-1", 0, 12)).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateNumber(ref n) if n == "TXN-1"));

        assert_eq!(repo.get_by_id("c-alice").await.unwrap().unwrap().loyalty_points, 565);
        assert_eq!(repo.history("c-alice").await.unwrap().len(), 1);

        let ledger: &dyn LoyaltyLedger = &repo;
        assert!(matches!(
            ledger.commit_points(&commit("TXN-1", 0, 12)).await,
            Err(PortError::DuplicateNumber(_))
        ));
    }

    #[tokio::test]
    async fn test_overdraw_rejected_without_writes() {
        let repo = setup(100).await;

        let err = repo.commit_points(&commit("TXN-2", 101, 5)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        assert_eq!(repo.get_by_id("c-alice").await.unwrap().unwrap().loyalty_points, 100);
        assert!(repo.history("c-alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let repo = setup(0).await;

        let mut missing = commit("TXN-3", 0, 10);
        missing.customer_id = "c-ghost".to_string();
        assert!(matches!(
            repo.commit_points(&missing).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_negative_movement_rejected() {
        let repo = setup(50).await;
        assert!(matches!(
            repo.commit_points(&commit("TXN-4", -1, 0)).await,
            Err(DbError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_ports() {
        let repo = setup(40).await;

        let directory: &dyn CustomerDirectory = &repo;
        let found = directory.find_customer("c-alice").await.unwrap();
        assert_eq!(found.map(|c| c.display_name()), Some("Alice Ng".to_string()));

        let ledger: &dyn LoyaltyLedger = &repo;
        let err = ledger.commit_points(&commit("TXN-5", 41, 0)).await.unwrap_err();
        assert!(matches!(err, PortError::Rejected(_)));
    }
}
