// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use frontdesk_core::types::{
    DailyQueue, EntryId, EntrySource, EntryStatus, HealthStatus, JoinIdentity, QueueEntry,
    QueueStats, Scope,
};
use frontdesk_core::{AdmissionRejection, ErrorKind, FrontdeskError, PluginAdapter};
use frontdesk_queue::{IssuedToken, JoinRequest};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_code: &'static str,
    pub error: String,
    /// Present for admission rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<AdmissionRejection>,
}

/// A [`FrontdeskError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub FrontdeskError);

impl From<FrontdeskError> for ApiError {
    fn from(err: FrontdeskError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, error, detail) = match (self.0.kind(), self.0) {
            // Rejections are an expected outcome of a well-formed request.
            (_, FrontdeskError::Admission(rejection)) => (
                StatusCode::OK,
                rejection_code(&rejection),
                rejection.to_string(),
                Some(rejection),
            ),
            (ErrorKind::InvalidToken, err) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", err.to_string(), None)
            }
            (ErrorKind::Validation, err) => {
                (StatusCode::BAD_REQUEST, "VALIDATION", err.to_string(), None)
            }
            (ErrorKind::Conflict, err) => (StatusCode::CONFLICT, "CONFLICT", err.to_string(), None),
            (ErrorKind::NotFound, err) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string(), None)
            }
            (_, err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal error".to_string(),
                    None,
                )
            }
        };
        (
            status,
            Json(ErrorResponse {
                success: false,
                error_code,
                error,
                detail,
            }),
        )
            .into_response()
    }
}

fn rejection_code(rejection: &AdmissionRejection) -> &'static str {
    use frontdesk_core::RejectionCode;
    match rejection.code {
        RejectionCode::TooEarly => "TOO_EARLY",
        RejectionCode::QueueClosed => "QUEUE_CLOSED",
        RejectionCode::QueueFull => "QUEUE_FULL",
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_secs: u64,
    pub store: String,
    pub hub: String,
}

/// Request body for POST /v1/join.
#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub token: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub source: Option<EntrySource>,
}

/// Response body for a successful join.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub success: bool,
    pub number: u32,
    pub duplicate: bool,
    pub room: String,
    pub stats: QueueStats,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub room: String,
    pub stats: QueueStats,
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub room: String,
    pub entries: Vec<QueueEntry>,
}

/// One `(entry, position)` pair in a reorder request.
#[derive(Debug, Deserialize)]
pub struct PositionBody {
    pub entry_id: EntryId,
    pub position: u32,
}

/// Request body for PUT /v1/queues/{resource_id}/{day}/order.
#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    pub order: Vec<PositionBody>,
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
    pub position: u32,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: EntryStatus,
}

fn describe(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(reason) => format!("degraded: {reason}"),
        HealthStatus::Unhealthy(reason) => format!("unhealthy: {reason}"),
    }
}

/// GET /health
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let store = state
        .service
        .store()
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
    let hub = state
        .hub
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
    let status = if store == HealthStatus::Healthy && hub == HealthStatus::Healthy {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        store: describe(&store),
        hub: describe(&hub),
    })
}

/// POST /v1/queues/{resource_id}/{day}/tokens
pub async fn post_token(
    State(state): State<GatewayState>,
    Path((resource_id, day)): Path<(String, String)>,
) -> ApiResult<IssuedToken> {
    let scope = Scope::parse(&resource_id, &day)?;
    Ok(Json(state.service.generate_token(&scope)?))
}

/// POST /v1/join
pub async fn post_join(
    State(state): State<GatewayState>,
    Json(body): Json<JoinBody>,
) -> ApiResult<JoinResponse> {
    let outcome = state
        .service
        .join(JoinRequest {
            token: body.token,
            identity: JoinIdentity {
                phone: body.phone,
                chat_id: body.chat_id,
            },
            display_name: body.display_name,
            source: body.source.unwrap_or(EntrySource::Qr),
        })
        .await?;
    Ok(Json(JoinResponse {
        success: true,
        number: outcome.number,
        duplicate: outcome.duplicate,
        room: outcome.scope.room(),
        stats: outcome.stats,
    }))
}

/// POST /v1/queues/{resource_id}/{day}/open
pub async fn post_open(
    State(state): State<GatewayState>,
    Path((resource_id, day)): Path<(String, String)>,
) -> ApiResult<DailyQueue> {
    let scope = Scope::parse(&resource_id, &day)?;
    Ok(Json(state.service.open_service(&scope).await?))
}

/// GET /v1/queues/{resource_id}/{day}/stats
pub async fn get_stats(
    State(state): State<GatewayState>,
    Path((resource_id, day)): Path<(String, String)>,
) -> ApiResult<StatsResponse> {
    let scope = Scope::parse(&resource_id, &day)?;
    let stats = state.service.stats(&scope).await?;
    Ok(Json(StatsResponse {
        room: scope.room(),
        stats,
    }))
}

/// GET /v1/queues/{resource_id}/{day}/entries
pub async fn get_entries(
    State(state): State<GatewayState>,
    Path((resource_id, day)): Path<(String, String)>,
) -> ApiResult<EntriesResponse> {
    let scope = Scope::parse(&resource_id, &day)?;
    let entries = state.service.list_entries(&scope).await?;
    Ok(Json(EntriesResponse {
        room: scope.room(),
        entries,
    }))
}

/// PUT /v1/queues/{resource_id}/{day}/order
pub async fn put_order(
    State(state): State<GatewayState>,
    Path((resource_id, day)): Path<(String, String)>,
    Json(body): Json<ReorderBody>,
) -> ApiResult<EntriesResponse> {
    let scope = Scope::parse(&resource_id, &day)?;
    let mapping: Vec<(EntryId, u32)> = body
        .order
        .iter()
        .map(|pair| (pair.entry_id, pair.position))
        .collect();
    let entries = state.service.reorder(&scope, &mapping).await?;
    Ok(Json(EntriesResponse {
        room: scope.room(),
        entries,
    }))
}

/// POST /v1/entries/{entry_id}/move
pub async fn post_move(
    State(state): State<GatewayState>,
    Path(entry_id): Path<i64>,
    Json(body): Json<MoveBody>,
) -> ApiResult<EntriesResponse> {
    let entries = state
        .service
        .move_entry(EntryId(entry_id), body.position)
        .await?;
    let room = entries
        .first()
        .map(|entry| entry.scope.room())
        .unwrap_or_default();
    Ok(Json(EntriesResponse { room, entries }))
}

/// POST /v1/entries/{entry_id}/status
pub async fn post_status(
    State(state): State<GatewayState>,
    Path(entry_id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> ApiResult<QueueEntry> {
    Ok(Json(
        state
            .service
            .transition(EntryId(entry_id), body.status)
            .await?,
    ))
}
