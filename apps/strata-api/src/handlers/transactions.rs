//! # Transaction Handlers
//!
//! Read access to completed, persisted transactions.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use strata_core::receipt::project;
use strata_core::{ReceiptDocument, TransactionRecord};
use strata_db::TransactionListItem;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub receipt: ReceiptDocument,
    pub receipt_text: Vec<String>,
}

/// `GET /api/transactions?limit=N`
///
/// Most recent first. `limit` defaults to 20 and is capped at 200.
pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<TransactionListItem>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = state.db.transactions().list_recent(limit).await?;
    Ok(Json(items))
}

/// `GET /api/transactions/{number}`
pub async fn get_by_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<Json<TransactionRecord>> {
    state
        .db
        .transactions()
        .get_by_number(&number)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Transaction", &number))
}

/// `GET /api/transactions/{number}/receipt`
///
/// Re-projects the stored record with the current store header, for reprints.
pub async fn reprint_receipt(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<Json<ReceiptResponse>> {
    let record = state
        .db
        .transactions()
        .get_by_number(&number)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", &number))?;

    let receipt = project(&record, &state.config.store)?;
    let receipt_text = receipt.render_text(state.config.receipt_width);
    Ok(Json(ReceiptResponse {
        receipt,
        receipt_text,
    }))
}
