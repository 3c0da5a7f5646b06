// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for the gateway.
//!
//! Staff routes require `Authorization: Bearer <token>`; when no token is
//! configured every staff request is rejected (fail-closed). Viewer sockets
//! are checked against an origin allow-list and an optional shared key
//! before the upgrade is accepted.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Staff authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects all staff requests.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Middleware guarding staff routes with the bearer token.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!("gateway has no bearer token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Connection-level checks for viewer subscriptions.
#[derive(Clone, Default)]
pub struct ViewerPolicy {
    /// Shared key viewers pass as `?key=`. `None` disables the key check.
    pub viewer_key: Option<String>,
    /// Allowed `Origin` values. Empty allows any origin, including none.
    pub allowed_origins: Vec<String>,
}

impl std::fmt::Debug for ViewerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerPolicy")
            .field("viewer_key", &self.viewer_key.as_ref().map(|_| "[redacted]"))
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl ViewerPolicy {
    /// Decide whether a subscription may proceed.
    pub fn check(&self, origin: Option<&str>, key: Option<&str>) -> Result<(), StatusCode> {
        if !self.allowed_origins.is_empty() {
            let allowed = origin.is_some_and(|origin| {
                self.allowed_origins
                    .iter()
                    .any(|allowed| allowed.trim_end_matches('/') == origin.trim_end_matches('/'))
            });
            if !allowed {
                tracing::debug!(origin = origin.unwrap_or("-"), "viewer origin rejected");
                return Err(StatusCode::FORBIDDEN);
            }
        }

        if let Some(expected) = self.viewer_key.as_deref()
            && key != Some(expected)
        {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(())
    }
}
