//! # Checkout Session
//!
//! One terminal's active transaction: identity, status, cart, payment, and
//! the transitions between them.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌────────┐  hold(reason)   ┌────────┐                                 │
//! │   │ Active │ ──────────────► │  Held  │  parked in HeldStore,          │
//! │   │        │ ◄────────────── │        │  session starts fresh          │
//! │   └───┬────┘  retrieve(code) └────────┘                                 │
//! │       │                                                                 │
//! │       │ capture_payment ──► (payment attached, cart frozen)            │
//! │       │ cancel_payment  ──► (cart editable again)                      │
//! │       │                                                                 │
//! │       ├── void_transaction(reason) ──► Voided ── acknowledge ──► fresh │
//! │       │                                                                 │
//! │       └── complete() ── points ── save ── receipt ──► Completed ─► fresh│
//! │                                                                         │
//! │   Any failed step leaves the session exactly as it was.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Completion and Retry
//! ```text
//! complete()
//!   │
//!   ├── nothing committed yet?
//!   │     ├── re-read the customer's balance, re-clamp the redemption
//!   │     ├── build the record (frozen from here on)
//!   │     └── ledger.commit_points ── number taken? ── new number, again
//!   │
//!   ├── store.save(frozen record) ── number taken, no points moved?
//!   │                                  └── new number, back to the top
//!   └── receipt, reset
//! ```
//! The ledger and the store are idempotent per transaction number. A failure
//! at either step keeps the session as it was, and calling `complete` again
//! resumes from the first unconfirmed step. Once points are committed the
//! frozen record is what gets saved, so the stored sale and the ledger
//! always agree.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, PortError};
use crate::held::HeldStore;
use crate::loyalty::LoyaltyConfig;
use crate::money::Money;
use crate::ports::{
    CustomerDirectory, LoyaltyCommit, LoyaltyLedger, ProductCatalog, SavedTransaction, TransactionStore,
};
use crate::receipt::{project, ReceiptDocument, StoreConfig};
use crate::types::{
    CartLine, CatalogLookup, Customer, CustomerRef, HeldSummary, HeldTransaction, LinePatch, LoyaltySummary,
    NewLine, Payment, PaymentMethod, TotalsSummary, TransactionRecord, TransactionStatus, VoidReason,
};
use crate::validation::{
    parse_tendered, validate_customer_id, validate_hold_reason, validate_park_code, validate_void_reason,
};

/// How many times completion stamps a new number after a collision.
const RENUMBER_ATTEMPTS: usize = 3;

/// `TXN-YYMMDD-HHMMSS-NNNN`, e.g. `TXN-250301-143015-0042`.
///
/// The suffix walks a process-wide sequence from a random start, so numbers
/// stamped in the same second by this process never repeat (up to 10 000 per
/// second). Another process sharing the store can still collide; the store
/// reports that as [`PortError::DuplicateNumber`].
pub fn generate_transaction_number(now: DateTime<Utc>) -> String {
    static SEQUENCE: OnceLock<AtomicU32> = OnceLock::new();
    let sequence = SEQUENCE.get_or_init(|| AtomicU32::new(rand::thread_rng().gen_range(0..10_000)));
    let suffix = sequence.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("TXN-{}-{:04}", now.format("%y%m%d-%H%M%S"), suffix)
}

// =============================================================================
// Session Outputs
// =============================================================================

/// What was voided, kept until the operator acknowledges.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VoidRecord {
    pub transaction_number: String,
    pub reason: VoidReason,
    pub line_count: usize,
    pub amount_due: Money,
    #[ts(as = "String")]
    pub voided_at: DateTime<Utc>,
}

/// Everything produced by a successful completion.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSale {
    pub record: TransactionRecord,
    pub saved: SavedTransaction,
    pub receipt: ReceiptDocument,
    /// Customer's balance after the point commit, when one happened.
    pub loyalty_balance: Option<i64>,
}

/// Record frozen by a completion attempt, kept until the save confirms.
#[derive(Debug, Clone)]
struct PendingCompletion {
    record: TransactionRecord,
    /// Balance returned by the ledger; `Some` once points have moved.
    loyalty_balance: Option<i64>,
}

impl PendingCompletion {
    fn points_committed(&self) -> bool {
        self.loyalty_balance.is_some()
    }
}

/// Read model of the session for the front end.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSnapshot {
    pub transaction_number: String,
    pub status: TransactionStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub lines: Vec<CartLine>,
    pub totals: TotalsSummary,
    pub customer: Option<Customer>,
    pub redeem_loyalty: bool,
    pub loyalty_enabled: bool,
    pub loyalty: LoyaltySummary,
    /// Fractional points preview before flooring.
    #[ts(type = "string")]
    pub points_earned_preview: rust_decimal::Decimal,
    pub amount_due: Money,
    pub payment: Option<Payment>,
    pub void: Option<VoidRecord>,
}

// =============================================================================
// Checkout
// =============================================================================

/// A terminal's checkout session.
///
/// Not internally synchronized; the owner serializes access (one lock per
/// terminal). The [`HeldStore`] inside is shared across sessions.
#[derive(Debug, Clone)]
pub struct Checkout {
    transaction_number: String,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    cart: Cart,
    payment: Option<Payment>,
    void: Option<VoidRecord>,
    pending: Option<PendingCompletion>,
    held: HeldStore,
    loyalty_config: Option<LoyaltyConfig>,
}

impl Checkout {
    /// Starts a session with a fresh active transaction.
    pub fn new(held: HeldStore, loyalty_config: Option<LoyaltyConfig>) -> Self {
        let now = Utc::now();
        Checkout {
            transaction_number: generate_transaction_number(now),
            status: TransactionStatus::Active,
            created_at: now,
            cart: Cart::new(loyalty_config),
            payment: None,
            void: None,
            pending: None,
            held,
            loyalty_config,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn transaction_number(&self) -> &str {
        &self.transaction_number
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    pub fn held_store(&self) -> &HeldStore {
        &self.held
    }

    // -------------------------------------------------------------------------
    // Guards
    // -------------------------------------------------------------------------

    fn ensure_active(&self, operation: &'static str) -> CoreResult<()> {
        if self.status != TransactionStatus::Active {
            return Err(CoreError::InvalidTransactionStatus {
                transaction_number: self.transaction_number.clone(),
                status: self.status,
                operation,
            });
        }
        Ok(())
    }

    /// Active and no payment attached.
    fn ensure_editable(&self, operation: &'static str) -> CoreResult<()> {
        self.ensure_active(operation)?;
        if self.payment.is_some() {
            return Err(CoreError::PaymentAlreadyCaptured(self.transaction_number.clone()));
        }
        Ok(())
    }

    /// Payment and void stay available until points have been committed.
    fn ensure_not_committed(&self) -> CoreResult<()> {
        match &self.pending {
            Some(pending) if pending.points_committed() => {
                Err(CoreError::CompletionPending(self.transaction_number.clone()))
            }
            _ => Ok(()),
        }
    }

    fn ensure_lines(&self) -> CoreResult<()> {
        if self.cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Cart Operations
    // -------------------------------------------------------------------------

    /// Adds a line with caller-supplied snapshot data.
    pub fn add_line(&mut self, new: NewLine) -> CoreResult<CartLine> {
        self.ensure_editable("add line")?;
        let line = self.cart.add_line(new)?;
        debug!(
            transaction_number = %self.transaction_number,
            line_id = %line.id,
            quantity = line.quantity,
            "Line added"
        );
        Ok(line)
    }

    /// Looks a variant up in the catalog, checks stock, and adds it.
    ///
    /// The stock check covers the quantity already in the cart for the
    /// same line, not just the units being added.
    pub async fn add_from_catalog(
        &mut self,
        catalog: &dyn ProductCatalog,
        lookup: &CatalogLookup,
        quantity: Option<u32>,
    ) -> CoreResult<CartLine> {
        self.ensure_editable("add line")?;

        let item = catalog
            .find_variant(lookup)
            .await
            .map_err(|e| CoreError::collaborator("catalog lookup", e))?
            .ok_or_else(|| CoreError::ProductNotFound(lookup.to_string()))?;

        let new = NewLine::from_catalog(&item, quantity);
        let requested = i64::from(self.cart.quantity_matching(&new)) + i64::from(quantity.unwrap_or(1));
        if !item.can_sell(requested) {
            warn!(
                transaction_number = %self.transaction_number,
                sku = %item.sku,
                available = item.quantity_on_hand,
                requested,
                "Insufficient stock"
            );
            return Err(CoreError::InsufficientStock {
                sku: item.sku,
                available: item.quantity_on_hand,
                requested,
            });
        }

        self.add_line(new)
    }

    pub fn update_line(&mut self, line_id: &str, patch: &LinePatch) -> CoreResult<CartLine> {
        self.ensure_editable("update line")?;
        let line = self.cart.update_line(line_id, patch)?;
        debug!(transaction_number = %self.transaction_number, line_id, "Line updated");
        Ok(line)
    }

    /// Removes one line with a mandatory reason. Unknown ids are a no-op.
    ///
    /// Status is unchanged; a cart emptied this way stays active.
    pub fn void_item(&mut self, line_id: &str, reason: Option<&VoidReason>) -> CoreResult<Option<CartLine>> {
        self.ensure_editable("void item")?;
        let removed = self.cart.remove_line(line_id, reason)?;
        if let (Some(line), Some(reason)) = (&removed, reason) {
            info!(
                transaction_number = %self.transaction_number,
                line_id,
                product_id = %line.product_id,
                quantity = line.quantity,
                reason = %reason,
                "Line voided"
            );
        }
        Ok(removed)
    }

    pub fn clear_cart(&mut self) -> CoreResult<()> {
        self.ensure_editable("clear cart")?;
        self.cart.clear();
        debug!(transaction_number = %self.transaction_number, "Cart cleared");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Customer & Loyalty
    // -------------------------------------------------------------------------

    /// Looks the customer up and attaches them to the transaction.
    pub async fn attach_customer(
        &mut self,
        directory: &dyn CustomerDirectory,
        customer_id: &str,
    ) -> CoreResult<Customer> {
        self.ensure_editable("attach customer")?;
        let customer_id = validate_customer_id(customer_id)?;

        let customer = directory
            .find_customer(customer_id)
            .await
            .map_err(|e| CoreError::collaborator("customer lookup", e))?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        self.cart.set_customer(Some(customer.clone()));
        debug!(
            transaction_number = %self.transaction_number,
            customer_id,
            points = customer.loyalty_points,
            "Customer attached"
        );
        Ok(customer)
    }

    pub fn detach_customer(&mut self) -> CoreResult<()> {
        self.ensure_editable("detach customer")?;
        self.cart.set_customer(None);
        Ok(())
    }

    /// Turns point redemption on or off. Without a customer it has no effect.
    pub fn set_redeem(&mut self, redeem: bool) -> CoreResult<()> {
        self.ensure_editable("change loyalty redemption")?;
        self.cart.set_redeem(redeem);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Hold / Retrieve
    // -------------------------------------------------------------------------

    /// Parks the transaction and starts a fresh one.
    ///
    /// ## Returns
    /// The park code the transaction can be retrieved with.
    pub fn hold(&mut self, reason: Option<&str>) -> CoreResult<String> {
        self.ensure_editable("hold")?;
        self.ensure_lines()?;
        let reason = validate_hold_reason(reason)?;

        let held = HeldTransaction {
            park_code: String::new(),
            transaction_number: self.transaction_number.clone(),
            reason,
            subtotal: self.cart.totals().subtotal,
            cart_items: self.cart.lines().to_vec(),
            customer: self.cart.customer().cloned(),
            redeem_loyalty: self.cart.redeem_loyalty(),
            created_at: self.created_at,
            held_at: Utc::now(),
        };
        let code = self.held.park(held);

        info!(
            transaction_number = %self.transaction_number,
            park_code = %code,
            status = %TransactionStatus::Held,
            lines = self.cart.line_count(),
            "Transaction held"
        );
        self.start_fresh();
        Ok(code)
    }

    /// Restores a held transaction into this session.
    ///
    /// The current transaction must have no lines. The held entry is removed
    /// atomically, so only one session can ever retrieve a given code.
    pub fn retrieve(&mut self, code: &str) -> CoreResult<HeldSummary> {
        let code = validate_park_code(code)?;
        self.ensure_editable("retrieve held transaction")?;
        if !self.cart.is_empty() {
            return Err(CoreError::CartNotEmpty);
        }

        let held = self.held.retrieve(code)?;
        let summary = HeldSummary::from(&held);

        self.transaction_number = held.transaction_number;
        self.created_at = held.created_at;
        self.cart.restore(held.cart_items, held.customer, held.redeem_loyalty);

        info!(
            transaction_number = %self.transaction_number,
            park_code = %code,
            lines = self.cart.line_count(),
            "Held transaction retrieved"
        );
        Ok(summary)
    }

    // -------------------------------------------------------------------------
    // Void
    // -------------------------------------------------------------------------

    /// Voids the whole transaction. Terminal until acknowledged.
    ///
    /// An attached payment is dropped with it; nothing was persisted.
    pub fn void_transaction(&mut self, reason: Option<&VoidReason>) -> CoreResult<VoidRecord> {
        self.ensure_active("void")?;
        self.ensure_not_committed()?;
        let reason = validate_void_reason(reason)?;

        let record = VoidRecord {
            transaction_number: self.transaction_number.clone(),
            reason: reason.clone(),
            line_count: self.cart.line_count(),
            amount_due: self.cart.amount_due(),
            voided_at: Utc::now(),
        };

        if self.payment.take().is_some() {
            warn!(transaction_number = %self.transaction_number, "Captured payment discarded by void");
        }
        self.pending = None;
        self.status = TransactionStatus::Voided;
        self.void = Some(record.clone());

        info!(
            transaction_number = %self.transaction_number,
            reason = %record.reason,
            lines = record.line_count,
            amount_due = %record.amount_due,
            "Transaction voided"
        );
        Ok(record)
    }

    /// Clears a voided session and starts a fresh transaction.
    pub fn acknowledge_void(&mut self) -> CoreResult<()> {
        if self.status != TransactionStatus::Voided {
            return Err(CoreError::InvalidTransactionStatus {
                transaction_number: self.transaction_number.clone(),
                status: self.status,
                operation: "acknowledge void",
            });
        }
        self.start_fresh();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------

    /// Attaches a payment covering the full amount due.
    ///
    /// ## Rules
    /// - Cart non-empty, no payment attached yet
    /// - Tender must parse, be positive, and be >= the amount due
    /// - Partial payments are rejected
    ///
    /// Does not complete the transaction.
    pub fn capture_payment(&mut self, method: PaymentMethod, tendered: &str) -> CoreResult<Payment> {
        self.ensure_editable("capture payment")?;
        self.ensure_lines()?;
        let tendered = parse_tendered(tendered)?;
        let due = self.cart.amount_due();

        if tendered < due {
            let shortfall = due - tendered;
            warn!(
                transaction_number = %self.transaction_number,
                tendered = %tendered,
                due = %due,
                "Insufficient tender"
            );
            return Err(CoreError::InsufficientTender {
                tendered: tendered.to_decimal(),
                due: due.to_decimal(),
                shortfall: shortfall.to_decimal(),
            });
        }

        let payment = Payment {
            method,
            amount_tendered: tendered,
            change_due: tendered - due,
            amount_paid: due,
            paid_at: Utc::now(),
        };
        self.payment = Some(payment.clone());

        info!(
            transaction_number = %self.transaction_number,
            method = payment.method.label(),
            paid = %payment.amount_paid,
            change = %payment.change_due,
            "Payment captured"
        );
        Ok(payment)
    }

    /// Detaches the payment so the cart can be edited again.
    pub fn cancel_payment(&mut self) -> CoreResult<Option<Payment>> {
        self.ensure_active("cancel payment")?;
        self.ensure_not_committed()?;
        self.pending = None;
        let cancelled = self.payment.take();
        if cancelled.is_some() {
            info!(transaction_number = %self.transaction_number, "Payment cancelled");
        }
        Ok(cancelled)
    }

    // -------------------------------------------------------------------------
    // Completion
    // -------------------------------------------------------------------------

    /// Builds the completed record for the current state.
    pub fn completed_record(&self, completed_at: DateTime<Utc>) -> CoreResult<TransactionRecord> {
        self.ensure_lines()?;
        let payment = self
            .payment
            .clone()
            .ok_or_else(|| CoreError::PaymentMissing(self.transaction_number.clone()))?;

        Ok(TransactionRecord {
            transaction_number: self.transaction_number.clone(),
            status: TransactionStatus::Completed,
            cart_items: self.cart.lines().to_vec(),
            totals: self.cart.totals().summary(),
            customer: self.cart.customer().map(CustomerRef::from),
            payment: Some(payment),
            loyalty: self.cart.loyalty().summary(),
            amount_due: self.cart.amount_due(),
            created_at: self.created_at,
            completed_at: Some(completed_at),
        })
    }

    /// Commits loyalty points, persists the transaction, and projects the receipt.
    ///
    /// ## Steps
    /// 1. Validate: active, lines present, payment attached
    /// 2. Re-read the customer's balance and re-clamp the redemption
    /// 3. `ledger.commit_points(...)` if a customer moved points
    /// 4. `store.save(record)`
    /// 5. Project the receipt, reset to a fresh transaction
    ///
    /// Steps 2 and 3 run once per transaction; a retry after a failed save
    /// goes straight to step 4 with the same record. A failure anywhere
    /// returns an error and leaves the session ready for the retry.
    pub async fn complete(
        &mut self,
        store: &dyn TransactionStore,
        directory: &dyn CustomerDirectory,
        ledger: &dyn LoyaltyLedger,
        store_config: &StoreConfig,
    ) -> CoreResult<CompletedSale> {
        self.ensure_active("complete")?;

        for _ in 0..RENUMBER_ATTEMPTS {
            let pending = match self.pending.clone() {
                Some(pending) => pending,
                None => self.prepare_completion(directory, ledger).await?,
            };

            match store.save(&pending.record).await {
                Ok(saved) => return self.finish(pending, saved, store_config),
                Err(PortError::DuplicateNumber(number)) if !pending.points_committed() => {
                    warn!(transaction_number = %number, "Transaction number taken, stamping a new one");
                    self.pending = None;
                    self.renumber();
                }
                Err(e) => {
                    warn!(
                        transaction_number = %pending.record.transaction_number,
                        error = %e,
                        "Save failed, transaction kept for retry"
                    );
                    return Err(CoreError::collaborator("save transaction", e));
                }
            }
        }

        Err(CoreError::collaborator(
            "save transaction",
            PortError::DuplicateNumber(self.transaction_number.clone()),
        ))
    }

    /// Re-clamps loyalty, freezes the record, and commits its points.
    async fn prepare_completion(
        &mut self,
        directory: &dyn CustomerDirectory,
        ledger: &dyn LoyaltyLedger,
    ) -> CoreResult<PendingCompletion> {
        self.refresh_loyalty(directory).await?;

        for _ in 0..RENUMBER_ATTEMPTS {
            let record = self.completed_record(Utc::now())?;

            match commit_record_points(ledger, &record).await {
                Ok(loyalty_balance) => {
                    let pending = PendingCompletion {
                        record,
                        loyalty_balance,
                    };
                    self.pending = Some(pending.clone());
                    return Ok(pending);
                }
                Err(PortError::DuplicateNumber(number)) => {
                    warn!(transaction_number = %number, "Transaction number taken in the ledger, stamping a new one");
                    self.renumber();
                }
                Err(e) => {
                    warn!(
                        transaction_number = %record.transaction_number,
                        error = %e,
                        "Loyalty commit failed, transaction kept for retry"
                    );
                    return Err(CoreError::collaborator("commit loyalty points", e));
                }
            }
        }

        Err(CoreError::collaborator(
            "commit loyalty points",
            PortError::DuplicateNumber(self.transaction_number.clone()),
        ))
    }

    /// Brings the attached customer's balance up to date before points move.
    ///
    /// Only matters when points are being redeemed. If the re-clamped amount
    /// due changes, the payment is re-priced when the tender still covers it
    /// and detached otherwise.
    async fn refresh_loyalty(&mut self, directory: &dyn CustomerDirectory) -> CoreResult<()> {
        let Some(attached) = self.cart.customer() else {
            return Ok(());
        };
        if self.cart.loyalty().points_redeemed == 0 {
            return Ok(());
        }

        let current = directory
            .find_customer(&attached.id)
            .await
            .map_err(|e| CoreError::collaborator("customer lookup", e))?
            .ok_or_else(|| CoreError::CustomerNotFound(attached.id.clone()))?;
        if current.loyalty_points == attached.loyalty_points {
            return Ok(());
        }

        debug!(
            transaction_number = %self.transaction_number,
            customer_id = %current.id,
            was = attached.loyalty_points,
            now = current.loyalty_points,
            "Loyalty balance changed since attach"
        );
        let due_before = self.cart.amount_due();
        self.cart.set_customer(Some(current));
        let due = self.cart.amount_due();
        if due == due_before {
            return Ok(());
        }

        let Some(tendered) = self.payment.as_ref().map(|p| p.amount_tendered) else {
            return Ok(());
        };
        if tendered >= due {
            if let Some(payment) = self.payment.as_mut() {
                payment.amount_paid = due;
                payment.change_due = tendered - due;
            }
            warn!(
                transaction_number = %self.transaction_number,
                due = %due,
                change = %(tendered - due),
                "Payment re-priced after loyalty re-clamp"
            );
            return Ok(());
        }

        self.payment = None;
        warn!(
            transaction_number = %self.transaction_number,
            due = %due,
            tendered = %tendered,
            "Payment detached after loyalty re-clamp"
        );
        Err(CoreError::LoyaltyBalanceChanged {
            transaction_number: self.transaction_number.clone(),
            amount_due: due.to_decimal(),
        })
    }

    fn finish(
        &mut self,
        pending: PendingCompletion,
        saved: SavedTransaction,
        store_config: &StoreConfig,
    ) -> CoreResult<CompletedSale> {
        let PendingCompletion {
            record,
            loyalty_balance,
        } = pending;
        let receipt = project(&record, store_config)?;

        info!(
            transaction_number = %record.transaction_number,
            transaction_id = %saved.transaction_id,
            total = %record.amount_due,
            lines = record.cart_items.len(),
            "Transaction completed"
        );
        self.start_fresh();

        Ok(CompletedSale {
            record,
            saved,
            receipt,
            loyalty_balance,
        })
    }

    /// Stamps a new number on the current transaction, keeping its contents.
    fn renumber(&mut self) {
        let previous = std::mem::replace(
            &mut self.transaction_number,
            generate_transaction_number(Utc::now()),
        );
        debug!(previous = %previous, transaction_number = %self.transaction_number, "Transaction renumbered");
    }

    // -------------------------------------------------------------------------
    // Reset
    // -------------------------------------------------------------------------

    /// Discards everything and stamps a new transaction number.
    pub fn reset(&mut self) {
        if self.pending.as_ref().is_some_and(PendingCompletion::points_committed) {
            warn!(
                transaction_number = %self.transaction_number,
                "Reset discards a transaction whose loyalty points are committed"
            );
        }
        debug!(transaction_number = %self.transaction_number, "Session reset");
        self.start_fresh();
    }

    fn start_fresh(&mut self) {
        let now = Utc::now();
        self.transaction_number = generate_transaction_number(now);
        self.status = TransactionStatus::Active;
        self.created_at = now;
        self.cart = Cart::new(self.loyalty_config);
        self.payment = None;
        self.void = None;
        self.pending = None;
    }

    pub fn snapshot(&self) -> CheckoutSnapshot {
        let loyalty = self.cart.loyalty();
        CheckoutSnapshot {
            transaction_number: self.transaction_number.clone(),
            status: self.status,
            created_at: self.created_at,
            lines: self.cart.lines().to_vec(),
            totals: self.cart.totals().summary(),
            customer: self.cart.customer().cloned(),
            redeem_loyalty: self.cart.redeem_loyalty(),
            loyalty_enabled: self.cart.loyalty_enabled(),
            loyalty: loyalty.summary(),
            points_earned_preview: loyalty.points_earned,
            amount_due: self.cart.amount_due(),
            payment: self.payment.clone(),
            void: self.void.clone(),
        }
    }
}

/// Commits the record's point movement, if it has one.
///
/// ## Returns
/// The customer's balance after the commit, or `None` when no points moved.
async fn commit_record_points(
    ledger: &dyn LoyaltyLedger,
    record: &TransactionRecord,
) -> Result<Option<i64>, PortError> {
    let Some(customer) = &record.customer else {
        return Ok(None);
    };
    let commit = LoyaltyCommit {
        customer_id: customer.id.clone(),
        transaction_number: record.transaction_number.clone(),
        points_redeemed: record.loyalty.points_redeemed,
        points_earned: record.loyalty.points_earned,
    };
    if commit.points_redeemed == 0 && commit.points_earned == 0 {
        return Ok(None);
    }
    ledger.commit_points(&commit).await.map(Some)
}

// =============================================================================
// Unit Tests
// =============================================================================
