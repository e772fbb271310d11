//! # Strata API Library
//!
//! REST backend for the Strata POS browser front end.
//!
//! ## Module Organization
//! ```text
//! strata_api/
//! ├── lib.rs          ◄─── You are here (router, logging, serve)
//! ├── config.rs       ◄─── STRATA_* environment configuration
//! ├── state.rs        ◄─── AppState: database, held store, terminal sessions
//! ├── error.rs        ◄─── ApiError and HTTP status mapping
//! └── handlers/
//!     ├── checkout.rs      ◄─── /api/terminals/{terminal}/checkout/...
//!     ├── transactions.rs  ◄─── /api/transactions/...
//!     └── health.rs        ◄─── /health
//! ```
//!
//! ## Routes
//! ```text
//! GET    /health
//! GET    /api/held
//! GET    /api/transactions?limit=N
//! GET    /api/transactions/{number}
//! GET    /api/transactions/{number}/receipt
//!
//! /api/terminals/{terminal}/checkout
//! GET    /                          snapshot
//! POST   /lines                     add line
//! POST   /scan                      add from catalog (id / sku / barcode)
//! PATCH  /lines/{line_id}           quantity, discount, price
//! POST   /lines/{line_id}/void      remove with reason
//! POST   /clear
//! PUT    /customer   DELETE /customer
//! PUT    /loyalty                   redeem on/off
//! POST   /hold       POST /retrieve
//! POST   /void       POST /void/acknowledge
//! POST   /payment    DELETE /payment
//! POST   /complete
//! POST   /reset
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, patch, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use handlers::{checkout, health, transactions};
use state::AppState;
use strata_db::{Database, DbConfig};

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let checkout_routes = Router::new()
        .route("/", get(checkout::snapshot))
        .route("/lines", post(checkout::add_line))
        .route("/scan", post(checkout::scan))
        .route("/lines/{line_id}", patch(checkout::update_line))
        .route("/lines/{line_id}/void", post(checkout::void_line))
        .route("/clear", post(checkout::clear))
        .route(
            "/customer",
            put(checkout::attach_customer).delete(checkout::detach_customer),
        )
        .route("/loyalty", put(checkout::set_redeem))
        .route("/hold", post(checkout::hold))
        .route("/retrieve", post(checkout::retrieve))
        .route("/void", post(checkout::void_transaction))
        .route("/void/acknowledge", post(checkout::acknowledge_void))
        .route(
            "/payment",
            post(checkout::capture_payment).delete(checkout::cancel_payment),
        )
        .route("/complete", post(checkout::complete))
        .route("/reset", post(checkout::reset));

    Router::new()
        .route("/health", get(health::health))
        .route("/api/held", get(checkout::list_held))
        .route("/api/transactions", get(transactions::list_recent))
        .route("/api/transactions/{number}", get(transactions::get_by_number))
        .route(
            "/api/transactions/{number}/receipt",
            get(transactions::reprint_receipt),
        )
        .nest("/api/terminals/{terminal}/checkout", checkout_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Opens the database and serves until Ctrl-C.
///
/// ## Startup Sequence
/// ```text
/// 1. Create the database directory if needed
/// 2. Connect to SQLite (WAL) and run pending migrations
/// 3. Build AppState (held store, empty session map)
/// 4. Bind and serve; on Ctrl-C stop accepting, drain, close the pool
/// ```
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = config.database_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    info!(path = %config.database_path.display(), "Database path determined");

    let db_config = DbConfig::new(config.database_path.clone());
    let db_config = if db_config.is_in_memory() {
        DbConfig::in_memory()
    } else {
        db_config
    };
    let db = Database::new(db_config).await?;
    info!("Database connected and migrations applied");

    let bind_addr = config.bind_addr;
    let state = AppState::new(db.clone(), config);
    let app = router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Strata API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=strata=trace` - Show trace for strata crates only
/// - Default: `info,strata=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,strata=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use strata_core::{CatalogItem, Customer, Percent};
    use tower::ServiceExt;

    async fn app() -> (Router, AppState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.catalog()
            .insert(&CatalogItem {
                product_id: "p-tee".to_string(),
                variant_id: "v-tee-m-blue".to_string(),
                sku: "TEE-M-BLU".to_string(),
                barcode: Some("2900000000005".to_string()),
                name: "Crew Tee".to_string(),
                size: Some("M".to_string()),
                color: Some("Blue".to_string()),
                unit_price: Decimal::new(2999, 2),
                tax_percent: Percent::new(Decimal::new(85, 1)),
                category_id: Some("tops".to_string()),
                quantity_on_hand: 3,
                allow_negative_stock: false,
            })
            .await
            .unwrap();

        db.customers()
            .insert(&Customer {
                id: "CUST-0001".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Ng".to_string(),
                email: None,
                loyalty_points: 1200,
                loyalty_program: Some("Gold".to_string()),
            })
            .await
            .unwrap();

        let config = AppConfig::from_lookup(|key| match key {
            "STRATA_DB_PATH" => Some(":memory:".to_string()),
            "STRATA_LOYALTY_POINT_VALUE" => Some("0.01".to_string()),
            "STRATA_LOYALTY_EARN_RATE" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();

        let state = AppState::new(db, config);
        (router(state.clone()), state)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    const LANE: &str = "/api/terminals/lane-1/checkout";

    #[tokio::test]
    async fn test_scan_redeem_pay_complete() {
        let (app, state) = app().await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("{}/scan", LANE),
            Some(json!({ "lookup": { "by": "sku", "value": "TEE-M-BLU" }, "quantity": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checkout"]["totals"]["grandTotal"], 6508);

        let (status, _) = call(
            &app,
            "PUT",
            &format!("{}/customer", LANE),
            Some(json!({ "customerId": "CUST-0001" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, snapshot) = call(&app, "PUT", &format!("{}/loyalty", LANE), Some(json!({ "redeem": true }))).await;
        // 1200 points x 0.01 = 12.00 off 65.08
        assert_eq!(snapshot["amountDue"], 5308);

        let (status, body) = call(
            &app,
            "POST",
            &format!("{}/payment", LANE),
            Some(json!({ "method": "cash", "tendered": "60" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["changeDue"], 692);

        let (status, body) = call(&app, "POST", &format!("{}/complete", LANE), None).await;
        assert_eq!(status, StatusCode::OK);
        let number = body["result"]["record"]["transactionNumber"].as_str().unwrap().to_string();
        assert_eq!(body["result"]["loyaltyBalance"], 53);
        assert!(!body["result"]["receiptText"].as_array().unwrap().is_empty());
        assert_eq!(body["checkout"]["lines"].as_array().unwrap().len(), 0);
        assert_ne!(body["checkout"]["transactionNumber"], number.as_str());

        let (status, stored) = call(&app, "GET", &format!("/api/transactions/{}", number), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["amountDue"], 5308);
        assert_eq!(stored["loyalty"]["pointsRedeemed"], 1200);

        let (status, reprint) = call(&app, "GET", &format!("/api/transactions/{}/receipt", number), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reprint["receipt"]["transactionNumber"], number.as_str());

        let (_, recent) = call(&app, "GET", "/api/transactions?limit=5", None).await;
        assert_eq!(recent.as_array().unwrap().len(), 1);

        assert_eq!(state.db.catalog().stock_level("v-tee-m-blue").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_stock_limit_counts_cart_quantity() {
        let (app, _) = app().await;
        let scan = json!({ "lookup": { "by": "barcode", "value": "2900000000005" }, "quantity": 2 });

        let (status, _) = call(&app, "POST", &format!("{}/scan", LANE), Some(scan.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "POST", &format!("{}/scan", LANE), Some(scan)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    }

    #[tokio::test]
    async fn test_hold_on_one_lane_retrieve_on_another() {
        let (app, _) = app().await;

        let line = json!({
            "productId": "p-cap",
            "variantId": "v-cap",
            "name": "Cap",
            "unitPrice": "10.00",
            "taxPercent": "8.5"
        });
        let (status, _) = call(&app, "POST", &format!("{}/lines", LANE), Some(line)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            "POST",
            &format!("{}/hold", LANE),
            Some(json!({ "reason": "customer went to the ATM" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let code = body["result"]["parkCode"].as_str().unwrap().to_string();
        assert!(code.starts_with("HLD-"));

        let (_, held) = call(&app, "GET", "/api/held", None).await;
        assert_eq!(held.as_array().unwrap().len(), 1);
        assert_eq!(held[0]["subtotal"], 1000);

        let retrieve = json!({ "parkCode": code });
        let (status, body) = call(
            &app,
            "POST",
            "/api/terminals/lane-2/checkout/retrieve",
            Some(retrieve.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checkout"]["lines"].as_array().unwrap().len(), 1);

        let (status, body) = call(&app, "POST", "/api/terminals/lane-3/checkout/retrieve", Some(retrieve)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_checkout_rules_map_to_statuses() {
        let (app, _) = app().await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("{}/payment", LANE),
            Some(json!({ "method": "card", "tendered": "5" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "BUSINESS_LOGIC");

        let line = json!({ "productId": "p", "variantId": "v", "name": "Belt", "unitPrice": "20" });
        call(&app, "POST", &format!("{}/lines", LANE), Some(line)).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("{}/payment", LANE),
            Some(json!({ "method": "cash", "tendered": "19.99" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "PAYMENT_ERROR");

        let (status, body) = call(&app, "POST", &format!("{}/void", LANE), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = call(
            &app,
            "POST",
            &format!("{}/void", LANE),
            Some(json!({ "reason": { "kind": "customer_request" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checkout"]["status"], "voided");

        let (status, body) = call(&app, "POST", &format!("{}/void/acknowledge", LANE), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");
    }

    #[tokio::test]
    async fn test_lookups_and_bad_input() {
        let (app, _) = app().await;

        let (status, _) = call(&app, "GET", "/api/transactions/TXN-000000-000000-0000", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/api/terminals/lane%201/checkout", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], true);
    }
}
