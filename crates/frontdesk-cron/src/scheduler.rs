// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-interval sweep closing online registration at each queue's cutoff.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveTime};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use frontdesk_config::model::SchedulerConfig;
use frontdesk_core::types::DailyQueue;
use frontdesk_queue::QueueService;

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Configured resources whose queue for today was ensured.
    pub materialized: usize,
    /// Queues whose online registration this sweep closed.
    pub closed: usize,
    /// Per-queue steps that failed and will be retried next sweep.
    pub failed: usize,
    pub bindings_purged: u64,
    pub locks_pruned: usize,
}

/// Closes online registration when `online_end_time` passes.
pub struct AutoCloseScheduler {
    service: Arc<QueueService>,
    interval: Duration,
}

impl AutoCloseScheduler {
    pub fn new(service: Arc<QueueService>, interval: Duration) -> Self {
        Self {
            service,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    pub fn from_config(service: Arc<QueueService>, config: &SchedulerConfig) -> Self {
        Self::new(service, Duration::from_secs(config.interval_secs))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sweep on every tick until `cancel` fires. The first sweep runs
    /// immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "auto-close scheduler running");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep().await;
                    if report.closed > 0 || report.failed > 0 {
                        info!(
                            closed = report.closed,
                            failed = report.failed,
                            bindings_purged = report.bindings_purged,
                            "scheduler sweep finished"
                        );
                    } else {
                        debug!(?report, "scheduler sweep finished");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }
    }

    /// Run one sweep. Failures are logged per queue and never stop the sweep.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let now = self.service.now();
        let calendar = self.service.settings().calendar;
        let today = calendar.today(now);
        let local_time = calendar.local_time(now);

        self.materialize(today, &mut report).await;

        // Yesterday is swept too, so a queue missed before midnight still closes.
        let mut days = vec![today];
        if let Some(yesterday) = today.checked_sub_days(Days::new(1)) {
            days.insert(0, yesterday);
        }
        for day in days {
            let queues = match self.service.store().list_queues(day).await {
                Ok(queues) => queues,
                Err(e) => {
                    warn!(day = %day, error = %e, "could not list queues for sweep");
                    report.failed += 1;
                    continue;
                }
            };
            for queue in queues {
                if !is_due(&queue, today, local_time) {
                    continue;
                }
                match self.service.close_online(&queue.scope).await {
                    Ok(true) => report.closed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(room = %queue.scope.room(), error = %e, "auto-close failed");
                        report.failed += 1;
                    }
                }
            }
        }

        match self.service.purge_expired_bindings(today).await {
            Ok(removed) => report.bindings_purged = removed,
            Err(e) => {
                warn!(error = %e, "binding purge failed");
                report.failed += 1;
            }
        }
        report.locks_pruned = self.service.prune_locks(today);
        report
    }

    async fn materialize(&self, today: NaiveDate, report: &mut SweepReport) {
        let resources: Vec<String> = self
            .service
            .settings()
            .admission
            .capacity()
            .resources()
            .map(str::to_string)
            .collect();

        for resource_id in resources {
            let scope = match self.service.scope(&resource_id, Some(today)) {
                Ok(scope) => scope,
                Err(e) => {
                    warn!(resource_id = %resource_id, error = %e, "skipping invalid resource");
                    report.failed += 1;
                    continue;
                }
            };
            match self.service.ensure_queue(&scope).await {
                Ok(_) => report.materialized += 1,
                Err(e) => {
                    warn!(room = %scope.room(), error = %e, "could not create daily queue");
                    report.failed += 1;
                }
            }
        }
    }
}

/// Still accepting online joins and past its cutoff.
fn is_due(queue: &DailyQueue, today: NaiveDate, local_time: NaiveTime) -> bool {
    if !queue.is_open || queue.opened_at.is_some() {
        return false;
    }
    queue.scope.day < today || local_time >= queue.online_end_time
}
