//! Health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub database: bool,
    pub terminals: usize,
    pub held: usize,
}

/// `GET /health`: 200 when the database answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let database = state.db.health_check().await;
    let status = if database { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(Health {
            status: if database { "ok" } else { "degraded" },
            database,
            terminals: state.session_count(),
            held: state.held.len(),
        }),
    )
}
