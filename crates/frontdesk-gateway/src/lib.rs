// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the online queue.
//!
//! Staff operations (tokens, open-service, stats, entries, reorder, move,
//! status) sit behind a bearer token. Patients join with a signed join token
//! in the request body. Viewers subscribe to a room over WebSocket.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use frontdesk_bus::BroadcastHub;
use frontdesk_config::model::GatewayConfig;
use frontdesk_core::types::HealthStatus;
use frontdesk_core::{FrontdeskError, PluginAdapter};
use frontdesk_queue::QueueService;

use crate::auth::{AuthConfig, ViewerPolicy};
use crate::server::{GatewayState, HealthState, ServerConfig};

pub use server::build_router;

impl GatewayState {
    /// Assemble handler state from configuration.
    pub fn from_config(
        service: Arc<QueueService>,
        hub: Arc<BroadcastHub>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            service,
            hub,
            auth: AuthConfig {
                bearer_token: config.bearer_token.clone(),
            },
            viewer: ViewerPolicy {
                viewer_key: config.viewer_key.clone(),
                allowed_origins: config.allowed_origins.clone(),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
            },
        }
    }
}

/// The gateway server as a managed adapter.
///
/// [`Gateway::start`] runs axum as a background task.
pub struct Gateway {
    config: ServerConfig,
    state: GatewayState,
    server_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Gateway {
    /// The server stops when `shutdown` fires or on [`PluginAdapter::shutdown`].
    pub fn new(config: &GatewayConfig, state: GatewayState, shutdown: &CancellationToken) -> Self {
        Self {
            config: ServerConfig {
                host: config.host.clone(),
                port: config.port,
            },
            state,
            server_handle: Mutex::new(None),
            cancel: shutdown.child_token(),
        }
    }

    /// Spawn the server task.
    pub async fn start(&self) {
        let config = self.config.clone();
        let state = self.state.clone();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = server::start_server(&config, state, cancel).await {
                tracing::error!(error = %e, "gateway server failed");
            }
        });
        *self.server_handle.lock().await = Some(handle);
    }
}

#[async_trait]
impl PluginAdapter for Gateway {
    fn name(&self) -> &str {
        "gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, FrontdeskError> {
        let handle = self.server_handle.lock().await;
        match handle.as_ref() {
            Some(handle) if !handle.is_finished() => Ok(HealthStatus::Healthy),
            Some(_) => Ok(HealthStatus::Unhealthy("server exited".to_string())),
            None => Ok(HealthStatus::Unhealthy("server not started".to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), FrontdeskError> {
        self.cancel.cancel();
        if let Some(handle) = self.server_handle.lock().await.take() {
            handle
                .await
                .map_err(|e| FrontdeskError::Internal(format!("gateway task failed: {e}")))?;
        }
        Ok(())
    }
}
