// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `frontdesk serve`: wire storage, queue service, hub, scheduler, and gateway.

use std::sync::Arc;

use tracing::{info, warn};

use frontdesk_bus::{BroadcastHub, HubSettings};
use frontdesk_config::FrontdeskConfig;
use frontdesk_core::{FrontdeskError, PluginAdapter, QueueStore};
use frontdesk_cron::AutoCloseScheduler;
use frontdesk_gateway::server::GatewayState;
use frontdesk_gateway::Gateway;
use frontdesk_queue::{QueueService, QueueSettings, TokenService};
use frontdesk_storage::SqliteQueueStore;

use crate::shutdown;

/// Run until SIGINT/SIGTERM, then stop components in reverse start order.
pub async fn run_serve(config: FrontdeskConfig) -> Result<(), FrontdeskError> {
    init_tracing(&config.clinic.log_level);

    info!(clinic = %config.clinic.name, "starting frontdesk serve");

    let store = SqliteQueueStore::new(config.storage.clone());
    store.initialize().await?;
    let store = Arc::new(store);
    info!(path = %config.storage.database_path, "queue store ready");

    let settings = QueueSettings::from_config(&config)?;
    let tokens = TokenService::from_config(&config.tokens, settings.calendar);

    let hub = Arc::new(BroadcastHub::new(HubSettings::from_config(&config.hub)));
    hub.start();

    let service = Arc::new(
        QueueService::new(store.clone(), settings, tokens).with_notifier(hub.clone()),
    );

    let cancel = shutdown::install_signal_handler();

    let scheduler_task = if config.scheduler.enabled {
        let scheduler = AutoCloseScheduler::from_config(service.clone(), &config.scheduler);
        let scheduler_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            scheduler.run(scheduler_cancel).await;
        }))
    } else {
        info!("auto-close scheduler disabled by configuration");
        None
    };

    let gateway = if config.gateway.enabled {
        let state = GatewayState::from_config(service.clone(), hub.clone(), &config.gateway);
        let gateway = Gateway::new(&config.gateway, state, &cancel);
        gateway.start().await;
        Some(gateway)
    } else {
        info!("gateway disabled by configuration");
        None
    };

    cancel.cancelled().await;
    info!("shutting down");

    if let Some(gateway) = &gateway
        && let Err(e) = gateway.shutdown().await
    {
        warn!(error = %e, "gateway shutdown failed");
    }
    if let Some(task) = scheduler_task
        && let Err(e) = task.await
    {
        warn!(error = %e, "scheduler task failed");
    }
    hub.stop().await;
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "store shutdown failed");
    }

    info!("frontdesk serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("frontdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
