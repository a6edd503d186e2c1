// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{
        health::{HealthChecks, HealthResponse, ReadyResponse},
        internal::ExecuteLaunchRequest,
        launches::{
            CreateLaunchRequest, CreateLaunchResponse, LaunchDetail, LaunchEventView,
            LaunchStatusResponse, LaunchSummary, PlatformWalletResponse,
        },
    },
    state::AppState,
    storage::{AuditEventType, LaunchStatus, PoolStatus},
};

pub mod health;
pub mod internal;
pub mod launches;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/launches",
            get(launches::list_launches).post(launches::create_launch),
        )
        .route("/launches/{launch_id}", get(launches::get_launch))
        .route(
            "/launches/{launch_id}/events",
            get(launches::list_launch_events),
        )
        .route("/launches/{launch_id}/retry", post(launches::retry_launch))
        .route("/platform-wallet", get(launches::get_platform_wallet));

    let internal_routes = Router::new()
        .route("/execute-launch", post(internal::execute_launch))
        .route(
            "/launches/{launch_id}/launched",
            post(internal::mark_launched),
        );

    let app = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .nest("/internal", internal_routes)
        .with_state(state);

    app.merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        launches::create_launch,
        launches::list_launches,
        launches::get_launch,
        launches::list_launch_events,
        launches::retry_launch,
        launches::get_platform_wallet,
        internal::execute_launch,
        internal::mark_launched
    ),
    components(
        schemas(
            CreateLaunchRequest,
            CreateLaunchResponse,
            LaunchSummary,
            LaunchDetail,
            LaunchEventView,
            AuditEventType,
            LaunchStatusResponse,
            PlatformWalletResponse,
            ExecuteLaunchRequest,
            LaunchStatus,
            PoolStatus,
            HealthResponse,
            ReadyResponse,
            HealthChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Launches", description = "Launch funding through the privacy pool"),
        (name = "Internal", description = "Background trigger and downstream launch hooks"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
