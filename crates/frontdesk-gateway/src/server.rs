// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use frontdesk_bus::BroadcastHub;
use frontdesk_core::FrontdeskError;
use frontdesk_queue::QueueService;

use crate::auth::{auth_middleware, AuthConfig, ViewerPolicy};
use crate::handlers;
use crate::ws;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<QueueService>,
    pub hub: Arc<BroadcastHub>,
    /// Staff authentication.
    pub auth: AuthConfig,
    /// Viewer subscription checks.
    pub viewer: ViewerPolicy,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors `GatewayConfig` from frontdesk-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the router:
/// - GET /health (public)
/// - POST /v1/join (join token in body)
/// - /v1/queues/... and /v1/entries/... (staff bearer token)
/// - GET /ws (origin and viewer key checked before upgrade)
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/v1/join", post(handlers::post_join))
        .with_state(state.clone());

    let staff_routes = Router::new()
        .route(
            "/v1/queues/{resource_id}/{day}/tokens",
            post(handlers::post_token),
        )
        .route("/v1/queues/{resource_id}/{day}/open", post(handlers::post_open))
        .route("/v1/queues/{resource_id}/{day}/stats", get(handlers::get_stats))
        .route(
            "/v1/queues/{resource_id}/{day}/entries",
            get(handlers::get_entries),
        )
        .route("/v1/queues/{resource_id}/{day}/order", put(handlers::put_order))
        .route("/v1/entries/{entry_id}/move", post(handlers::post_move))
        .route("/v1/entries/{entry_id}/status", post(handlers::post_status))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(staff_routes)
        .merge(ws_routes)
        .layer(cors_layer(&state.viewer.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);
    if allowed_origins.is_empty() {
        return layer.allow_origin(AllowOrigin::any());
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin.trim_end_matches('/')).ok())
        .collect();
    layer.allow_origin(origins)
}

/// Serve the gateway until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), FrontdeskError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FrontdeskError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| FrontdeskError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway server stopped");
    Ok(())
}
