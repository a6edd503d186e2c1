// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Internal job endpoints.
//!
//! Invoked by the background trigger and by the downstream launch step, not
//! by end users. Both still require a session for the launch owner and, when
//! `INTERNAL_JOB_SECRET` is configured, the `x-internal-job-secret` header.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    api::launches::LaunchStatusResponse, auth::Auth, auth::AuthError, error::ApiError,
    state::AppState,
};

pub const INTERNAL_JOB_SECRET_HEADER: &str = "x-internal-job-secret";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExecuteLaunchRequest {
    pub id: String,
}

/// Compare digests so timing does not depend on where the inputs differ.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn check_job_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AuthError> {
    let Some(expected) = state.internal_job_secret.as_deref() else {
        return Ok(());
    };
    let provided = headers
        .get(INTERNAL_JOB_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if secrets_match(provided, expected) {
        Ok(())
    } else {
        warn!("Internal job request with missing or wrong secret");
        Err(AuthError::InvalidJobSecret)
    }
}

/// Run the deposit and withdraw pipeline for one launch.
///
/// Idempotent per id: settled or in-flight launches are reported, not re-run.
#[utoipa::path(
    post,
    path = "/internal/execute-launch",
    request_body = ExecuteLaunchRequest,
    tag = "Internal",
    responses(
        (status = 200, description = "Status after execution", body = LaunchStatusResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Wrong job secret"),
        (status = 404, description = "Launch not found"),
        (status = 409, description = "Insufficient funds"),
        (status = 502, description = "Withdrawal rejected"),
        (status = 503, description = "Privacy pool temporarily unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn execute_launch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Auth(user): Auth,
    Json(request): Json<ExecuteLaunchRequest>,
) -> Result<Json<LaunchStatusResponse>, ApiError> {
    check_job_secret(&state, &headers)?;
    let status = state
        .engine
        .execute_launch(&user.user_id, &request.id)
        .await?;
    Ok(Json(LaunchStatusResponse {
        id: request.id,
        status,
    }))
}

/// Record that a funded launch has been consumed downstream.
#[utoipa::path(
    post,
    path = "/internal/launches/{launch_id}/launched",
    params(("launch_id" = String, Path, description = "Launch identifier")),
    tag = "Internal",
    responses(
        (status = 200, body = LaunchStatusResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Wrong job secret"),
        (status = 404, description = "Launch not found"),
        (status = 409, description = "Launch is not funded")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_launched(
    State(state): State<AppState>,
    headers: HeaderMap,
    Auth(user): Auth,
    Path(launch_id): Path<String>,
) -> Result<Json<LaunchStatusResponse>, ApiError> {
    check_job_secret(&state, &headers)?;
    let status = state.engine.mark_launched(&user.user_id, &launch_id).await?;
    Ok(Json(LaunchStatusResponse {
        id: launch_id,
        status,
    }))
}
