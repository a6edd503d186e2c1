// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch API endpoints.
//!
//! All operations require authentication and are scoped to the caller.
//! Launches owned by someone else are reported as not found.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    blockchain::format_native,
    error::ApiError,
    launch::LaunchJob,
    rate_limit::{
        RateDecision, ACTION_LAUNCH_CREATE, ACTION_LAUNCH_EVENTS, ACTION_LAUNCH_GET,
        ACTION_LAUNCH_LIST, ACTION_LAUNCH_RETRY,
    },
    state::AppState,
    storage::{AuditEvent, AuditEventType, LaunchRecord, LaunchStatus, PoolStatus},
};

/// Request to fund a new launch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateLaunchRequest {
    /// Amount in wei, as a decimal string.
    #[schema(example = "50000000000000000")]
    pub amount_wei: String,
    /// Opaque client metadata stored with the launch.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateLaunchResponse {
    pub id: String,
    /// Wallet that receives the withdrawn funds.
    pub launch_wallet_address: String,
}

/// Launch as shown in listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LaunchSummary {
    pub id: String,
    pub status: LaunchStatus,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub launch_wallet_address: String,
}

impl From<LaunchRecord> for LaunchSummary {
    fn from(record: LaunchRecord) -> Self {
        Self {
            id: record.id.clone(),
            status: record.status(),
            metadata: record.metadata,
            launch_wallet_address: record.launch_wallet_address,
        }
    }
}

/// Full public view of a launch. Key material is never included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LaunchDetail {
    pub id: String,
    pub status: LaunchStatus,
    pub pool_status: PoolStatus,
    /// Requested amount in wei, as a decimal string.
    pub amount_wei: String,
    /// Requested amount in native units.
    pub amount: String,
    pub platform_wallet_address: String,
    pub launch_wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdraw_tx: Option<String>,
    /// Failed pipeline attempts since creation or the last manual retry.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LaunchRecord> for LaunchDetail {
    fn from(record: LaunchRecord) -> Self {
        let status = record.status();
        let pool = record.pool().clone();
        Self {
            id: record.id,
            status,
            pool_status: pool.status,
            amount_wei: record.requested_amount.to_string(),
            amount: format_native(record.requested_amount),
            platform_wallet_address: record.platform_wallet_address,
            launch_wallet_address: record.launch_wallet_address,
            deposit_tx: pool.deposit_tx,
            withdraw_tx: pool.withdraw_tx,
            attempts: pool.attempts,
            last_error: pool.last_error,
            metadata: record.metadata,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// One entry of a launch's history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LaunchEventView {
    pub event_type: AuditEventType,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl From<AuditEvent> for LaunchEventView {
    fn from(event: AuditEvent) -> Self {
        Self {
            event_type: event.event_type,
            success: event.success,
            error: event.error,
            details: event.details,
            timestamp: event.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LaunchStatusResponse {
    pub id: String,
    pub status: LaunchStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlatformWalletResponse {
    /// Custodial wallet that funds the caller's launches.
    pub address: String,
}

fn enforce_rate_limit(state: &AppState, user_id: &str, action: &str) -> Result<(), ApiError> {
    match state.rate_limiter.check(user_id, action) {
        RateDecision::Allow => Ok(()),
        RateDecision::Deny => Err(ApiError::too_many_requests()),
    }
}

fn parse_amount(raw: &str) -> Result<u128, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "amount_wei must be a non-negative decimal integer",
        ));
    }
    trimmed
        .parse::<u128>()
        .map_err(|_| ApiError::bad_request("amount_wei is out of range"))
}

/// Create a launch and queue its funding in the background.
#[utoipa::path(
    post,
    path = "/v1/launches",
    request_body = CreateLaunchRequest,
    tag = "Launches",
    responses(
        (status = 201, description = "Launch created", body = CreateLaunchResponse),
        (status = 400, description = "Invalid amount"),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Platform wallet balance too low"),
        (status = 429, description = "Rate limited")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_launch(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<CreateLaunchRequest>,
) -> Result<(StatusCode, Json<CreateLaunchResponse>), ApiError> {
    enforce_rate_limit(&state, &user.user_id, ACTION_LAUNCH_CREATE)?;
    let amount = parse_amount(&request.amount_wei)?;

    let created = state
        .engine
        .create_launch(&user.user_id, amount, request.metadata)
        .await?;

    let queued = state.dispatcher.dispatch(LaunchJob {
        launch_id: created.id.clone(),
        owner_user_id: user.user_id.clone(),
    });
    info!(
        launch_id = %created.id,
        user_id = %user.user_id,
        queued,
        "Launch accepted"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateLaunchResponse {
            id: created.id,
            launch_wallet_address: created.launch_wallet_address,
        }),
    ))
}

/// List the caller's launches, newest first.
#[utoipa::path(
    get,
    path = "/v1/launches",
    tag = "Launches",
    responses(
        (status = 200, body = [LaunchSummary]),
        (status = 401, description = "Not authenticated"),
        (status = 429, description = "Rate limited")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_launches(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<LaunchSummary>>, ApiError> {
    enforce_rate_limit(&state, &user.user_id, ACTION_LAUNCH_LIST)?;
    let launches = state.engine.list_launches(&user.user_id)?;
    Ok(Json(launches.into_iter().map(LaunchSummary::from).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/launches/{launch_id}",
    params(("launch_id" = String, Path, description = "Launch identifier")),
    tag = "Launches",
    responses(
        (status = 200, body = LaunchDetail),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Launch not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_launch(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(launch_id): Path<String>,
) -> Result<Json<LaunchDetail>, ApiError> {
    enforce_rate_limit(&state, &user.user_id, ACTION_LAUNCH_GET)?;
    let record = state.engine.get_launch(&user.user_id, &launch_id)?;
    Ok(Json(LaunchDetail::from(record)))
}

/// History of a launch: creation, pool calls, deferrals and retries.
#[utoipa::path(
    get,
    path = "/v1/launches/{launch_id}/events",
    params(("launch_id" = String, Path, description = "Launch identifier")),
    tag = "Launches",
    responses(
        (status = 200, body = Vec<LaunchEventView>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Launch not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_launch_events(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(launch_id): Path<String>,
) -> Result<Json<Vec<LaunchEventView>>, ApiError> {
    enforce_rate_limit(&state, &user.user_id, ACTION_LAUNCH_EVENTS)?;
    let events = state.engine.launch_events(&user.user_id, &launch_id)?;
    Ok(Json(events.into_iter().map(LaunchEventView::from).collect()))
}

/// Reset a stalled or failed launch and queue it again.
///
/// Funded and launched launches are left untouched.
#[utoipa::path(
    post,
    path = "/v1/launches/{launch_id}/retry",
    params(("launch_id" = String, Path, description = "Launch identifier")),
    tag = "Launches",
    responses(
        (status = 202, description = "Retry queued, or launch already settled", body = LaunchStatusResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Launch not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("bearer_auth" = []))
)]
pub async fn retry_launch(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(launch_id): Path<String>,
) -> Result<(StatusCode, Json<LaunchStatusResponse>), ApiError> {
    enforce_rate_limit(&state, &user.user_id, ACTION_LAUNCH_RETRY)?;
    let status = state.engine.prepare_retry(&user.user_id, &launch_id).await?;

    if status == LaunchStatus::DepositPending {
        state.dispatcher.dispatch(LaunchJob {
            launch_id: launch_id.clone(),
            owner_user_id: user.user_id.clone(),
        });
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(LaunchStatusResponse {
            id: launch_id,
            status,
        }),
    ))
}

/// The caller's platform wallet, created on first use.
#[utoipa::path(
    get,
    path = "/v1/platform-wallet",
    tag = "Launches",
    responses(
        (status = 200, body = PlatformWalletResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_platform_wallet(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<PlatformWalletResponse>, ApiError> {
    let address = state.engine.platform_wallet(&user.user_id)?;
    Ok(Json(PlatformWalletResponse { address }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_json, issue_session, TestApp, MIN_AMOUNT};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    fn authed(method: Method, uri: &str, user: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", issue_session(user)));
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn create_body(amount: u128) -> serde_json::Value {
        serde_json::json!({ "amount_wei": amount.to_string(), "metadata": { "name": "demo" } })
    }

    #[test]
    fn parse_amount_rejects_signs_and_garbage() {
        assert_eq!(parse_amount(" 42 ").unwrap(), 42);
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("999999999999999999999999999999999999999999").is_err());
    }

    #[tokio::test]
    async fn create_requires_authentication() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/launches")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(create_body(MIN_AMOUNT).to_string()))
            .unwrap();

        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_returns_id_and_launch_wallet() {
        let app = TestApp::new();
        let response = app
            .router()
            .oneshot(authed(Method::POST, "/v1/launches", "alice", Some(create_body(MIN_AMOUNT))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let id = body["id"].as_str().unwrap();
        let address = body["launch_wallet_address"].as_str().unwrap();
        assert!(address.starts_with("0x"));

        let stored = app.harness.ledger.get_launch(id).unwrap().unwrap();
        assert_eq!(stored.owner_user_id, "alice");
        assert_eq!(stored.launch_wallet_address, address);
    }

    #[tokio::test]
    async fn below_minimum_is_bad_request() {
        let app = TestApp::new();
        let response = app
            .router()
            .oneshot(authed(
                Method::POST,
                "/v1/launches",
                "alice",
                Some(create_body(MIN_AMOUNT - 1)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.harness.ledger.list_by_owner("alice").unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_scoped_to_caller() {
        let app = TestApp::new();
        app.harness
            .engine
            .create_launch("alice", MIN_AMOUNT, serde_json::json!({ "n": 1 }))
            .await
            .unwrap();
        app.harness
            .engine
            .create_launch("bob", MIN_AMOUNT, serde_json::json!({ "n": 2 }))
            .await
            .unwrap();

        let response = app
            .router()
            .oneshot(authed(Method::GET, "/v1/launches", "alice", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let launches = body.as_array().unwrap();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0]["status"], "deposit_pending");
        assert_eq!(launches[0]["metadata"]["n"], 1);
    }

    #[tokio::test]
    async fn launch_events_are_owner_scoped() {
        let app = TestApp::new();
        let created = app
            .harness
            .engine
            .create_launch("alice", MIN_AMOUNT, serde_json::Value::Null)
            .await
            .unwrap();
        let uri = format!("/v1/launches/{}/events", created.id);

        let response = app
            .router()
            .oneshot(authed(Method::GET, &uri, "alice", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let events = body.as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event_type"], "launch_created");
        assert_eq!(events[0]["success"], true);

        let foreign = app
            .router()
            .oneshot(authed(Method::GET, &uri, "bob", None))
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_users_launch_is_not_found() {
        let app = TestApp::new();
        let created = app
            .harness
            .engine
            .create_launch("alice", MIN_AMOUNT, serde_json::Value::Null)
            .await
            .unwrap();

        let uri = format!("/v1/launches/{}", created.id);
        let response = app
            .router()
            .oneshot(authed(Method::GET, &uri, "bob", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .router()
            .oneshot(authed(Method::GET, &uri, "alice", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["pool_status"], "deposit_pending");
        assert_eq!(body["amount_wei"], MIN_AMOUNT.to_string());
        assert!(body.get("launch_wallet_secret_encrypted").is_none());
    }

    #[tokio::test]
    async fn retry_of_funded_launch_is_a_no_op() {
        let app = TestApp::new();
        let created = app
            .harness
            .engine
            .create_launch("alice", MIN_AMOUNT, serde_json::Value::Null)
            .await
            .unwrap();
        app.harness
            .engine
            .execute_launch("alice", &created.id)
            .await
            .unwrap();

        let uri = format!("/v1/launches/{}/retry", created.id);
        let response = app
            .router()
            .oneshot(authed(Method::POST, &uri, "alice", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["status"], "funded");
        assert_eq!(app.harness.pool.withdraw_calls(), 1);
    }

    #[tokio::test]
    async fn platform_wallet_is_stable() {
        let app = TestApp::new();
        let first = body_json(
            app.router()
                .oneshot(authed(Method::GET, "/v1/platform-wallet", "alice", None))
                .await
                .unwrap(),
        )
        .await;
        let second = body_json(
            app.router()
                .oneshot(authed(Method::GET, "/v1/platform-wallet", "alice", None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(first["address"], second["address"]);
    }

    #[tokio::test]
    async fn rate_limited_requests_get_429() {
        let app = TestApp::with_rate_limit(1);
        let first = app
            .router()
            .oneshot(authed(Method::GET, "/v1/launches", "alice", None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .router()
            .oneshot(authed(Method::GET, "/v1/launches", "alice", None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn rate_limited_create_has_no_side_effects() {
        let app = TestApp::with_rate_limit(0);
        let response = app
            .router()
            .oneshot(authed(Method::POST, "/v1/launches", "alice", Some(create_body(MIN_AMOUNT))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(app.harness.ledger.get_platform_wallet("alice").unwrap().is_none());
    }
}
