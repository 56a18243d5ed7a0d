//! REST API Endpoints
//!
//! HTTP surface of the service:
//! - POST /api/deposits              - Initiate a deposit
//! - GET  /api/deposits              - List the caller's deposits
//! - GET  /api/deposits/:id          - Poll one deposit (reconciles first)
//! - POST /api/webhooks/nowpayments  - Processor webhook (IPN)
//! - GET  /api/balance               - Current balance
//! - POST /api/investments           - Create a funded investment
//! - GET  /api/investments           - List the caller's investments
//! - POST /api/notify/welcome        - Queue a welcome email
//! - POST /api/notify/password-reset - Queue a password reset email
//! - POST /api/notify/email-change   - Queue an email-change notice
//! - GET  /api/health                - Health check
//!
//! Caller identity arrives in the `x-account-id` header, set by the edge
//! proxy after session validation. The webhook route is the only
//! unauthenticated mutating route; it identifies deposits by invoice id.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use super::server::SharedAppState;
use crate::lifecycle::LifecycleError;
use crate::notify::templates;
use crate::storage::LedgerError;
use crate::types::{
    units, CreateDepositRequest, CreateDepositResponse, CreateInvestmentRequest, DepositResponse,
    InvestmentRecord, InvestmentResponse,
};

/// Header carrying the authenticated account id
const ACCOUNT_HEADER: &str = "x-account-id";

/// Create the API router
pub fn create_router(state: SharedAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Deposit endpoints
        .route("/api/deposits", post(handle_create_deposit))
        .route("/api/deposits", get(handle_list_deposits))
        .route("/api/deposits/:id", get(handle_poll_deposit))
        // Processor webhook
        .route("/api/webhooks/nowpayments", post(handle_webhook))
        // Balance and investments
        .route("/api/balance", get(handle_get_balance))
        .route("/api/investments", post(handle_create_investment))
        .route("/api/investments", get(handle_list_investments))
        // Notifications
        .route("/api/notify/welcome", post(handle_notify_welcome))
        .route(
            "/api/notify/password-reset",
            post(handle_notify_password_reset),
        )
        .route("/api/notify/email-change", post(handle_notify_email_change))
        // Health check
        .route("/api/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Extract the authenticated account id from the request headers
fn account_id(headers: &HeaderMap) -> Result<String, (StatusCode, Json<serde_json::Value>)> {
    headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "Unauthorized",
                    "details": "missing x-account-id header"
                })),
            )
        })
}

fn error_response(status: StatusCode, error: &str, details: String) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "details": details
        })),
    )
        .into_response()
}

// =============================================================================
// Deposit Handlers
// =============================================================================

/// POST /api/deposits
///
/// Create a processor invoice and persist a waiting deposit record.
async fn handle_create_deposit(
    State(state): State<SharedAppState>,
    headers: HeaderMap,
    Json(req): Json<CreateDepositRequest>,
) -> impl IntoResponse {
    let account_id = match account_id(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };

    match state.service.initiate(&account_id, &req).await {
        Ok(record) => {
            let response = CreateDepositResponse {
                success: true,
                deposit_id: Some(record.id),
                invoice_id: Some(record.invoice_id),
                invoice_url: Some(record.invoice_url),
                error: None,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let status = match &e {
                LifecycleError::InvalidAmount(_) | LifecycleError::UnsupportedCurrency(_) => {
                    StatusCode::BAD_REQUEST
                }
                LifecycleError::Gateway(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let response = CreateDepositResponse {
                success: false,
                deposit_id: None,
                invoice_id: None,
                invoice_url: None,
                error: Some(e.to_string()),
            };
            (status, Json(response)).into_response()
        }
    }
}

/// GET /api/deposits
///
/// List the caller's deposits, newest first.
async fn handle_list_deposits(
    State(state): State<SharedAppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let account_id = match account_id(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };

    match state.service.deposits_for(&account_id).await {
        Ok(records) => {
            let deposits: Vec<DepositResponse> =
                records.iter().map(DepositResponse::from).collect();
            Json(serde_json::json!({ "deposits": deposits })).into_response()
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error",
            e.to_string(),
        ),
    }
}

/// GET /api/deposits/:id
///
/// Poll one deposit. The processor is consulted for non-terminal deposits
/// before answering.
async fn handle_poll_deposit(
    State(state): State<SharedAppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let account_id = match account_id(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };

    match state.service.poll(&account_id, &id).await {
        Ok(record) => (StatusCode::OK, Json(DepositResponse::from(&record))).into_response(),
        // A foreign deposit is indistinguishable from a missing one
        Err(LifecycleError::NotFound(_)) | Err(LifecycleError::Forbidden) => error_response(
            StatusCode::NOT_FOUND,
            "Not found",
            format!("Deposit {} not found", id),
        ),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error",
            e.to_string(),
        ),
    }
}

/// POST /api/webhooks/nowpayments
///
/// Processor IPN endpoint. Always acknowledges with 200 once the body is
/// JSON; the processor retries on anything else and a failure here is never
/// the processor's problem to fix.
async fn handle_webhook(
    State(state): State<SharedAppState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    if let Err(e) = state.service.ingest_webhook(&payload).await {
        warn!(error = %e, "webhook processing failed");
    }

    (StatusCode::OK, Json(serde_json::json!({ "received": true })))
}

// =============================================================================
// Balance and Investment Handlers
// =============================================================================

/// GET /api/balance
///
/// Current balance of the caller's account. An account the ledger has never
/// seen reads as zero.
async fn handle_get_balance(
    State(state): State<SharedAppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let account_id = match account_id(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };

    match state.ledger.balance_of(&account_id).await {
        Ok(balance_cents) => Json(serde_json::json!({
            "account_id": account_id,
            "balance_usd": units::cents_to_usd(balance_cents),
        }))
        .into_response(),
        Err(LedgerError::AccountNotFound(_)) => Json(serde_json::json!({
            "account_id": account_id,
            "balance_usd": 0.0,
        }))
        .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error",
            e.to_string(),
        ),
    }
}

/// POST /api/investments
///
/// Create an investment funded from the caller's balance. The debit and the
/// insert are one atomic step in the store.
async fn handle_create_investment(
    State(state): State<SharedAppState>,
    headers: HeaderMap,
    Json(req): Json<CreateInvestmentRequest>,
) -> impl IntoResponse {
    let account_id = match account_id(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };

    let principal_cents = match units::usd_to_cents(req.amount_usd).filter(|c| *c > 0) {
        Some(cents) => cents,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid amount",
                format!("{}", req.amount_usd),
            )
        }
    };

    if !(req.roi_percent.is_finite() && req.roi_percent > 0.0) || req.duration_days == 0 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid plan terms",
            "roi_percent and duration_days must be positive".to_string(),
        );
    }
    let roi_bps = (req.roi_percent * 100.0).round() as u32;

    let record = InvestmentRecord::new(
        account_id,
        req.plan_id,
        req.plan_name,
        principal_cents,
        roi_bps,
        req.duration_days,
    );

    match state.investments.create_funded(&record).await {
        Ok(()) => (StatusCode::OK, Json(InvestmentResponse::from(&record))).into_response(),
        Err(e @ LedgerError::InsufficientFunds { .. })
        | Err(e @ LedgerError::AccountNotFound(_)) => {
            error_response(StatusCode::BAD_REQUEST, "Cannot fund investment", e.to_string())
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error",
            e.to_string(),
        ),
    }
}

/// GET /api/investments
///
/// List the caller's investments, newest first.
async fn handle_list_investments(
    State(state): State<SharedAppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let account_id = match account_id(&headers) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };

    match state.investments.get_for_account(&account_id).await {
        Ok(records) => {
            let investments: Vec<InvestmentResponse> =
                records.iter().map(InvestmentResponse::from).collect();
            Json(serde_json::json!({ "investments": investments })).into_response()
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error",
            e.to_string(),
        ),
    }
}

// =============================================================================
// Notification Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct WelcomeEmailRequest {
    email: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PasswordResetEmailRequest {
    email: String,
    reset_link: String,
}

#[derive(Debug, Deserialize)]
struct EmailChangeRequest {
    email: String,
    new_email: String,
}

/// POST /api/notify/welcome
///
/// Queue a welcome email. Answers 202 immediately; delivery is detached.
async fn handle_notify_welcome(
    State(state): State<SharedAppState>,
    Json(req): Json<WelcomeEmailRequest>,
) -> impl IntoResponse {
    state
        .notifier
        .send_detached(templates::welcome(&req.email, &req.name));
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "queued": true })))
}

/// POST /api/notify/password-reset
async fn handle_notify_password_reset(
    State(state): State<SharedAppState>,
    Json(req): Json<PasswordResetEmailRequest>,
) -> impl IntoResponse {
    state
        .notifier
        .send_detached(templates::password_reset(&req.email, &req.reset_link));
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "queued": true })))
}

/// POST /api/notify/email-change
async fn handle_notify_email_change(
    State(state): State<SharedAppState>,
    Json(req): Json<EmailChangeRequest>,
) -> impl IntoResponse {
    state
        .notifier
        .send_detached(templates::email_change(&req.email, &req.new_email));
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "queued": true })))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /api/health
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "fundgate",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::AppState;
    use crate::gateway::{Invoice, MockPaymentGateway};
    use crate::notify::{Notifier, NullMailer};
    use crate::storage::{BalanceLedger, DepositStore, MemoryStores};
    use axum::{body::Body, http::Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn mock_gateway() -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_invoice().returning(|_, _, _| {
            Ok(Invoice {
                invoice_id: "INV1".to_string(),
                invoice_url: "https://pay.example/INV1".to_string(),
            })
        });
        gateway
    }

    fn test_app(gateway: MockPaymentGateway) -> (Router, Arc<MemoryStores>) {
        let stores = Arc::new(MemoryStores::new());
        let state = AppState::new(
            Arc::new(gateway),
            stores.clone(),
            stores.clone(),
            stores.clone(),
            Notifier::new(Arc::new(NullMailer)),
            1_000,
        );
        (create_router(state), stores)
    }

    fn post_json(uri: &str, account: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(account) = account {
            builder = builder.header(ACCOUNT_HEADER, account);
        }
        builder
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    fn get_req(uri: &str, account: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(account) = account {
            builder = builder.header(ACCOUNT_HEADER, account);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = test_app(MockPaymentGateway::new());

        let response = app.oneshot(get_req("/api/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_deposit() {
        let (app, _) = test_app(mock_gateway());

        let body = serde_json::json!({ "amount_usd": 100.0, "pay_currency": "btc" });
        let response = app
            .oneshot(post_json("/api/deposits", Some("acct_1"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["invoice_url"], "https://pay.example/INV1");
    }

    #[tokio::test]
    async fn test_create_deposit_requires_account_header() {
        let (app, _) = test_app(mock_gateway());

        let body = serde_json::json!({ "amount_usd": 100.0 });
        let response = app
            .oneshot(post_json("/api/deposits", None, body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_deposit_below_minimum() {
        let (app, _) = test_app(MockPaymentGateway::new());

        let body = serde_json::json!({ "amount_usd": 1.0 });
        let response = app
            .oneshot(post_json("/api/deposits", Some("acct_1"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_unknown_invoice() {
        let (app, _) = test_app(MockPaymentGateway::new());

        let body = serde_json::json!({
            "invoice_id": "INV404",
            "payment_status": "finished",
        });
        let response = app
            .oneshot(post_json("/api/webhooks/nowpayments", None, body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_credit_reflected_in_balance() {
        let (app, _) = test_app(mock_gateway());

        let create = serde_json::json!({ "amount_usd": 100.0 });
        let response = app
            .clone()
            .oneshot(post_json("/api/deposits", Some("acct_1"), create))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let webhook = serde_json::json!({
            "invoice_id": "INV1",
            "payment_id": "pay_1",
            "payment_status": "finished",
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/webhooks/nowpayments", None, webhook))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_req("/api/balance", Some("acct_1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["balance_usd"], 100.0);
    }

    #[tokio::test]
    async fn test_balance_of_unknown_account_is_zero() {
        let (app, _) = test_app(MockPaymentGateway::new());

        let response = app
            .oneshot(get_req("/api/balance", Some("acct_new")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["balance_usd"], 0.0);
    }

    #[tokio::test]
    async fn test_foreign_deposit_reads_as_missing() {
        let (app, stores) = test_app(mock_gateway());

        let create = serde_json::json!({ "amount_usd": 100.0 });
        let response = app
            .clone()
            .oneshot(post_json("/api/deposits", Some("acct_1"), create))
            .await
            .unwrap();
        let json = body_json(response).await;
        let deposit_id = json["deposit_id"].as_str().unwrap().to_string();
        assert!(stores.get_by_id(&deposit_id).await.unwrap().is_some());

        let response = app
            .oneshot(get_req(
                &format!("/api/deposits/{}", deposit_id),
                Some("acct_2"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_investment_requires_funds() {
        let (app, stores) = test_app(MockPaymentGateway::new());

        let body = serde_json::json!({
            "plan_id": "plan_gold",
            "plan_name": "Gold",
            "amount_usd": 500.0,
            "roi_percent": 1.5,
            "duration_days": 30,
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/investments", Some("acct_1"), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Fund the account, then the same request succeeds
        stores.create_account("acct_1").await.unwrap();
        stores.credit("acct_1", 100_000).await.unwrap();

        let response = app
            .clone()
            .oneshot(post_json("/api/investments", Some("acct_1"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["amount_usd"], 500.0);
        assert_eq!(json["status"], "active");

        assert_eq!(stores.balance_of("acct_1").await.unwrap(), 50_000);

        let response = app
            .oneshot(get_req("/api/investments", Some("acct_1")))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["investments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_investment_rejects_bad_terms() {
        let (app, _) = test_app(MockPaymentGateway::new());

        let body = serde_json::json!({
            "plan_id": "plan",
            "plan_name": "Plan",
            "amount_usd": 500.0,
            "roi_percent": -1.0,
            "duration_days": 30,
        });
        let response = app
            .oneshot(post_json("/api/investments", Some("acct_1"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_notify_endpoints_accept() {
        let (app, _) = test_app(MockPaymentGateway::new());

        let body = serde_json::json!({ "email": "user@example.com", "name": "Ada" });
        let response = app
            .oneshot(post_json("/api/notify/welcome", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
