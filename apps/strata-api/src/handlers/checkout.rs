//! # Checkout Handlers
//!
//! One checkout session per terminal, addressed as
//! `/api/terminals/{terminal}/checkout`.
//!
//! ## Checkout Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Lifecycle                                   │
//! │                                                                         │
//! │  ┌──────────┐  lines   ┌──────────┐ payment ┌──────────┐ complete       │
//! │  │  Empty   │────────►│ In Cart  │────────►│  Paid    │────────► new   │
//! │  │  Active  │  scan    │          │◄────────│ (frozen) │          txn   │
//! │  └──────────┘          └──────────┘ DELETE   └──────────┘                │
//! │       ▲                  │   │      payment                             │
//! │       │ retrieve         │   │                                          │
//! │       │            hold  │   │ void ──► Voided ── void/acknowledge ──►  │
//! │   HeldStore ◄────────────┘   │                              new txn     │
//! │                              └── clear / reset                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations answer with the result and the session snapshot after it:
//! `{ "result": ..., "checkout": { ... } }`.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::state::AppState;
use strata_core::{
    CartLine, CatalogLookup, CheckoutSnapshot, CompletedSale, Customer, HeldSummary, LinePatch,
    NewLine, Payment, PaymentMethod, VoidReason, VoidRecord,
};

// =============================================================================
// Request / Response Types
// =============================================================================

/// A mutation's result plus the session state after it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T> {
    pub result: T,
    pub checkout: CheckoutSnapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub lookup: CatalogLookup,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Body for line and transaction voids; a missing reason is rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoidRequest {
    #[serde(default)]
    pub reason: Option<VoidReason>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub customer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyRequest {
    pub redeem: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldResponse {
    pub park_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub park_code: String,
}

/// Tender as typed by the operator, e.g. `"70"` or `"70.00"`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub tendered: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    #[serde(flatten)]
    pub sale: CompletedSale,
    /// Receipt rendered at the configured width, one entry per printed line.
    pub receipt_text: Vec<String>,
}

// =============================================================================
// Session
// =============================================================================

/// `GET /api/terminals/{terminal}/checkout`
pub async fn snapshot(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
) -> ApiResult<Json<CheckoutSnapshot>> {
    let session = state.session(&terminal)?;
    let checkout = session.lock().await;
    Ok(Json(checkout.snapshot()))
}

/// `POST /api/terminals/{terminal}/checkout/reset`
///
/// Discards the session, including any unsaved payment.
pub async fn reset(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
) -> ApiResult<Json<CheckoutSnapshot>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;
    info!(%terminal, transaction_number = checkout.transaction_number(), "Session reset requested");
    checkout.reset();
    Ok(Json(checkout.snapshot()))
}

// =============================================================================
// Lines
// =============================================================================

/// `POST /api/terminals/{terminal}/checkout/lines`
///
/// Adds a line from a full description. Same product, size and color
/// merges into the existing line.
pub async fn add_line(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(new): Json<NewLine>,
) -> ApiResult<Json<Outcome<CartLine>>> {
    debug!(%terminal, product_id = %new.product_id, "add_line");
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let line = checkout.add_line(new)?;
    Ok(Json(Outcome {
        result: line,
        checkout: checkout.snapshot(),
    }))
}

/// `POST /api/terminals/{terminal}/checkout/scan`
///
/// ## User Workflow
/// ```text
/// scanner reads "290000000005"
///      │
///      ▼
/// { "lookup": { "by": "barcode", "value": "290000000005" } }
///      │
///      ▼
/// catalog lookup ──► stock check (cart qty + 1) ──► add / merge
/// ```
pub async fn scan(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Json<Outcome<CartLine>>> {
    debug!(%terminal, lookup = %request.lookup, "scan");
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let catalog = state.db.catalog();
    let line = checkout
        .add_from_catalog(&catalog, &request.lookup, request.quantity)
        .await?;
    Ok(Json(Outcome {
        result: line,
        checkout: checkout.snapshot(),
    }))
}

/// `PATCH /api/terminals/{terminal}/checkout/lines/{line_id}`
pub async fn update_line(
    State(state): State<AppState>,
    Path((terminal, line_id)): Path<(String, String)>,
    Json(patch): Json<LinePatch>,
) -> ApiResult<Json<Outcome<CartLine>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let line = checkout.update_line(&line_id, &patch)?;
    Ok(Json(Outcome {
        result: line,
        checkout: checkout.snapshot(),
    }))
}

/// `POST /api/terminals/{terminal}/checkout/lines/{line_id}/void`
///
/// `result` is the removed line, or `null` when the id was not in the cart.
pub async fn void_line(
    State(state): State<AppState>,
    Path((terminal, line_id)): Path<(String, String)>,
    Json(request): Json<VoidRequest>,
) -> ApiResult<Json<Outcome<Option<CartLine>>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let removed = checkout.void_item(&line_id, request.reason.as_ref())?;
    Ok(Json(Outcome {
        result: removed,
        checkout: checkout.snapshot(),
    }))
}

/// `POST /api/terminals/{terminal}/checkout/clear`
pub async fn clear(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
) -> ApiResult<Json<CheckoutSnapshot>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    checkout.clear_cart()?;
    Ok(Json(checkout.snapshot()))
}

// =============================================================================
// Customer & Loyalty
// =============================================================================

/// `PUT /api/terminals/{terminal}/checkout/customer`
pub async fn attach_customer(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<CustomerRequest>,
) -> ApiResult<Json<Outcome<Customer>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let directory = state.db.customers();
    let customer = checkout.attach_customer(&directory, &request.customer_id).await?;
    Ok(Json(Outcome {
        result: customer,
        checkout: checkout.snapshot(),
    }))
}

/// `DELETE /api/terminals/{terminal}/checkout/customer`
pub async fn detach_customer(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
) -> ApiResult<Json<CheckoutSnapshot>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    checkout.detach_customer()?;
    Ok(Json(checkout.snapshot()))
}

/// `PUT /api/terminals/{terminal}/checkout/loyalty`
pub async fn set_redeem(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<LoyaltyRequest>,
) -> ApiResult<Json<CheckoutSnapshot>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    checkout.set_redeem(request.redeem)?;
    Ok(Json(checkout.snapshot()))
}

// =============================================================================
// Hold / Retrieve / Void
// =============================================================================

/// `POST /api/terminals/{terminal}/checkout/hold`
///
/// Parks the transaction and starts a fresh one on this terminal.
pub async fn hold(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<HoldRequest>,
) -> ApiResult<Json<Outcome<HoldResponse>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let park_code = checkout.hold(request.reason.as_deref())?;
    info!(%terminal, %park_code, "Transaction held");
    Ok(Json(Outcome {
        result: HoldResponse { park_code },
        checkout: checkout.snapshot(),
    }))
}

/// `POST /api/terminals/{terminal}/checkout/retrieve`
///
/// Works from any terminal; the code is consumed.
pub async fn retrieve(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<RetrieveRequest>,
) -> ApiResult<Json<Outcome<HeldSummary>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let summary = checkout.retrieve(&request.park_code)?;
    info!(%terminal, park_code = %summary.park_code, "Held transaction retrieved");
    Ok(Json(Outcome {
        result: summary,
        checkout: checkout.snapshot(),
    }))
}

/// `POST /api/terminals/{terminal}/checkout/void`
pub async fn void_transaction(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<VoidRequest>,
) -> ApiResult<Json<Outcome<VoidRecord>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let record = checkout.void_transaction(request.reason.as_ref())?;
    Ok(Json(Outcome {
        result: record,
        checkout: checkout.snapshot(),
    }))
}

/// `POST /api/terminals/{terminal}/checkout/void/acknowledge`
pub async fn acknowledge_void(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
) -> ApiResult<Json<CheckoutSnapshot>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    checkout.acknowledge_void()?;
    Ok(Json(checkout.snapshot()))
}

// =============================================================================
// Payment & Completion
// =============================================================================

/// `POST /api/terminals/{terminal}/checkout/payment`
///
/// Captures the tender against the amount due. The cart is frozen until
/// the payment is cancelled or the transaction completes.
pub async fn capture_payment(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<Json<Outcome<Payment>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let payment = checkout.capture_payment(request.method, &request.tendered)?;
    Ok(Json(Outcome {
        result: payment,
        checkout: checkout.snapshot(),
    }))
}

/// `DELETE /api/terminals/{terminal}/checkout/payment`
pub async fn cancel_payment(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
) -> ApiResult<Json<Outcome<Option<Payment>>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let cancelled = checkout.cancel_payment()?;
    Ok(Json(Outcome {
        result: cancelled,
        checkout: checkout.snapshot(),
    }))
}

/// `POST /api/terminals/{terminal}/checkout/complete`
///
/// ## Flow
/// ```text
/// re-check balance ──► commit points (idempotent) ──► save (idempotent) ──► receipt
///        │                        │                          │
///        409, pay again           503, unchanged             503, points kept
///                                 └──── retry the same request ┘
/// ```
pub async fn complete(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
) -> ApiResult<Json<Outcome<Completion>>> {
    let session = state.session(&terminal)?;
    let mut checkout = session.lock().await;

    let store = state.db.transactions();
    let customers = state.db.customers();
    let sale = checkout
        .complete(&store, &customers, &customers, &state.config.store)
        .await?;
    let receipt_text = sale.receipt.render_text(state.config.receipt_width);

    Ok(Json(Outcome {
        result: Completion { sale, receipt_text },
        checkout: checkout.snapshot(),
    }))
}

// =============================================================================
// Held Listing
// =============================================================================

/// `GET /api/held`
///
/// Held transactions across all terminals, oldest first.
pub async fn list_held(State(state): State<AppState>) -> Json<Vec<HeldSummary>> {
    Json(state.held.list())
}
