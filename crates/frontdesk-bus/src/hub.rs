// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room-scoped broadcast hub.
//!
//! Mutation paths call [`BroadcastHub::publish`], which only enqueues onto a
//! bounded worker channel. Delivery workers drain those channels and push
//! frames to each subscriber's own buffer. Rooms are sharded across workers
//! by hash, so updates for one room arrive in publish order.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use frontdesk_config::model::HubConfig;
use frontdesk_core::types::{HealthStatus, QueueStats, Scope};
use frontdesk_core::{FrontdeskError, PluginAdapter, QueueNotifier};

use crate::error::DeliveryError;
use crate::messages::HubMessage;

/// Identifies one subscriber connection.
pub type ConnectionId = Uuid;

type Room = HashMap<ConnectionId, mpsc::Sender<Arc<str>>>;
type Rooms = DashMap<String, Room>;

/// Hub sizing and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    pub workers: usize,
    pub backlog: usize,
    pub subscriber_buffer: usize,
    pub send_timeout: Duration,
}

impl HubSettings {
    pub fn from_config(config: &HubConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            backlog: config.backlog.max(1),
            subscriber_buffer: config.subscriber_buffer.max(1),
            send_timeout: Duration::from_millis(config.send_timeout_ms),
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self::from_config(&HubConfig::default())
    }
}

/// A live subscription. Frames arrive on `receiver`; dropping it makes the
/// next delivery prune the connection.
#[derive(Debug)]
pub struct Subscription {
    pub id: ConnectionId,
    pub room: String,
    pub receiver: mpsc::Receiver<Arc<str>>,
}

struct Delivery {
    room: String,
    frame: Arc<str>,
}

/// Fan-out of per-room updates to subscribed connections.
///
/// Constructed at server start, shared by `Arc`, and stopped with
/// [`BroadcastHub::stop`].
pub struct BroadcastHub {
    settings: HubSettings,
    rooms: Arc<Rooms>,
    shards: Vec<mpsc::Sender<Delivery>>,
    pending: Mutex<Vec<mpsc::Receiver<Delivery>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl BroadcastHub {
    /// Create a hub. Nothing is delivered until [`start`](Self::start).
    pub fn new(settings: HubSettings) -> Self {
        let workers = settings.workers.max(1);
        let (shards, pending): (Vec<_>, Vec<_>) = (0..workers)
            .map(|_| mpsc::channel(settings.backlog.max(1)))
            .unzip();
        Self {
            settings,
            rooms: Arc::new(DashMap::new()),
            shards,
            pending: Mutex::new(pending),
            handles: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    /// Spawn the delivery workers. Must be called inside a tokio runtime.
    /// Calling it twice is a no-op.
    pub fn start(&self) {
        let receivers: Vec<_> = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()),
        );
        if receivers.is_empty() {
            debug!("broadcast hub already started");
            return;
        }

        let spawned: Vec<JoinHandle<()>> = receivers
            .into_iter()
            .enumerate()
            .map(|(index, rx)| {
                tokio::spawn(run_worker(
                    index,
                    rx,
                    Arc::clone(&self.rooms),
                    self.settings.send_timeout,
                    self.cancel.clone(),
                ))
            })
            .collect();
        info!(workers = spawned.len(), "broadcast hub started");
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(spawned);
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && !self
                .handles
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_empty()
    }

    /// Add a connection to `room`. The handshake frame is queued on the new
    /// connection before it can receive any room traffic.
    pub fn subscribe(&self, room: &str) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.settings.subscriber_buffer);
        let id = Uuid::new_v4();
        match HubMessage::accepted(room).to_frame() {
            Ok(frame) => {
                if let Err(e) = tx.try_send(frame) {
                    debug!(room, error = %e, "handshake not queued");
                }
            }
            Err(e) => warn!(room, error = %e, "could not encode handshake"),
        }
        self.rooms.entry(room.to_string()).or_default().insert(id, tx);
        debug!(room, connection = %id, "subscriber joined");
        Subscription {
            id,
            room: room.to_string(),
            receiver,
        }
    }

    /// Remove a connection. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, room: &str, id: ConnectionId) -> bool {
        let removed = remove_connection(&self.rooms, room, id);
        if removed {
            debug!(room, connection = %id, "subscriber left");
        }
        removed
    }

    /// Enqueue `frame` for every subscriber of `room`. Never blocks and never
    /// fails; a full backlog drops the update.
    pub fn publish(&self, room: &str, frame: Arc<str>) {
        let shard = &self.shards[shard_for(room, self.shards.len())];
        let delivery = Delivery {
            room: room.to_string(),
            frame,
        };
        match shard.try_send(delivery) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(room, "broadcast backlog full, update dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(room, "broadcast hub stopped, update dropped");
            }
        }
    }

    /// Encode and publish a message to its room.
    pub fn broadcast(&self, message: &HubMessage) {
        match message.to_frame() {
            Ok(frame) => self.publish(message.room(), frame),
            Err(e) => warn!(room = message.room(), error = %e, "could not encode update"),
        }
    }

    /// Push a message to one connection only. A closed connection is pruned.
    pub fn send_to(
        &self,
        room: &str,
        id: ConnectionId,
        message: &HubMessage,
    ) -> Result<(), DeliveryError> {
        let frame = message
            .to_frame()
            .map_err(|e| DeliveryError::Encode(e.to_string()))?;
        let sender = self
            .rooms
            .get(room)
            .and_then(|members| members.get(&id).cloned())
            .ok_or_else(|| DeliveryError::UnknownConnection {
                room: room.to_string(),
                connection: id.to_string(),
            })?;
        match sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DeliveryError::Full),
            Err(TrySendError::Closed(_)) => {
                prune(&self.rooms, room, id, &DeliveryError::Closed);
                Err(DeliveryError::Closed)
            }
        }
    }

    pub fn subscriber_count(&self, room: &str) -> usize {
        self.rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Stop the workers and drop every connection.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handles: Vec<_> =
            std::mem::take(&mut *self.handles.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "hub worker ended abnormally");
            }
        }
        let connections: usize = self.rooms.iter().map(|room| room.len()).sum();
        self.rooms.clear();
        info!(connections, "broadcast hub stopped");
    }
}

impl QueueNotifier for BroadcastHub {
    fn queue_changed(&self, scope: &Scope, stats: &QueueStats) {
        self.broadcast(&HubMessage::queue_update(scope.room(), *stats));
    }
}

#[async_trait]
impl PluginAdapter for BroadcastHub {
    fn name(&self) -> &str {
        "broadcast-hub"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, FrontdeskError> {
        if self.is_running() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("hub workers not running".to_string()))
        }
    }

    async fn shutdown(&self) -> Result<(), FrontdeskError> {
        self.stop().await;
        Ok(())
    }
}

fn shard_for(room: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    room.hash(&mut hasher);
    (hasher.finish() % shards.max(1) as u64) as usize
}

fn remove_connection(rooms: &Rooms, room: &str, id: ConnectionId) -> bool {
    let removed = match rooms.get_mut(room) {
        Some(mut members) => members.remove(&id).is_some(),
        None => false,
    };
    rooms.remove_if(room, |_, members| members.is_empty());
    removed
}

fn prune(rooms: &Rooms, room: &str, id: ConnectionId, reason: &DeliveryError) {
    if remove_connection(rooms, room, id) {
        debug!(room, connection = %id, reason = %reason, "subscriber pruned");
    }
}

async fn run_worker(
    index: usize,
    mut rx: mpsc::Receiver<Delivery>,
    rooms: Arc<Rooms>,
    send_timeout: Duration,
    cancel: CancellationToken,
) {
    debug!(worker = index, "hub worker running");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            delivery = rx.recv() => match delivery {
                Some(delivery) => deliver(&rooms, delivery, send_timeout).await,
                None => break,
            },
        }
    }
    debug!(worker = index, "hub worker exiting");
}

async fn deliver(rooms: &Rooms, delivery: Delivery, send_timeout: Duration) {
    // Copy the member list so connects and disconnects never wait on sends.
    let targets: Vec<(ConnectionId, mpsc::Sender<Arc<str>>)> = match rooms.get(&delivery.room) {
        Some(members) => members
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect(),
        None => return,
    };

    let sends = targets.into_iter().map(|(id, tx)| {
        let frame = Arc::clone(&delivery.frame);
        async move { (id, send_with_timeout(&tx, frame, send_timeout).await) }
    });
    for (id, result) in futures::future::join_all(sends).await {
        if let Err(reason) = result {
            prune(rooms, &delivery.room, id, &reason);
        }
    }
}

async fn send_with_timeout(
    tx: &mpsc::Sender<Arc<str>>,
    frame: Arc<str>,
    send_timeout: Duration,
) -> Result<(), DeliveryError> {
    match tokio::time::timeout(send_timeout, tx.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(DeliveryError::Closed),
        Err(_) => Err(DeliveryError::TimedOut(millis(send_timeout))),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shards_are_stable_and_in_range() {
        for shards in 1..5 {
            let a = shard_for("dr-lee::2026-03-14", shards);
            assert!(a < shards);
            assert_eq!(a, shard_for("dr-lee::2026-03-14", shards));
        }
    }

    #[test]
    fn timeout_millis_saturate() {
        assert_eq!(millis(Duration::from_millis(250)), 250);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn settings_clamp_zero_sizes() {
        let settings = HubSettings::from_config(&HubConfig {
            workers: 0,
            backlog: 0,
            subscriber_buffer: 0,
            send_timeout_ms: 10,
        });
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.backlog, 1);
        assert_eq!(settings.subscriber_buffer, 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_empty_room() {
        let hub = BroadcastHub::new(HubSettings::default());
        let sub = hub.subscribe("r::2026-03-14");
        assert_eq!(hub.subscriber_count("r::2026-03-14"), 1);
        assert!(hub.unsubscribe("r::2026-03-14", sub.id));
        assert!(!hub.unsubscribe("r::2026-03-14", sub.id));
        assert_eq!(hub.room_count(), 0);
    }

    #[tokio::test]
    async fn publish_before_start_is_buffered() {
        let hub = BroadcastHub::new(HubSettings::default());
        let mut sub = hub.subscribe("r::2026-03-14");
        let _handshake = sub.receiver.recv().await.unwrap();

        hub.publish("r::2026-03-14", Arc::from("early"));
        hub.start();
        let frame = sub.receiver.recv().await.unwrap();
        assert_eq!(&*frame, "early");
        hub.stop().await;
    }

    #[tokio::test]
    async fn full_backlog_drops_without_error() {
        let hub = BroadcastHub::new(HubSettings {
            workers: 1,
            backlog: 1,
            subscriber_buffer: 4,
            send_timeout: Duration::from_millis(50),
        });
        for _ in 0..10 {
            hub.publish("r::2026-03-14", Arc::from("x"));
        }
        assert!(!hub.is_running());
    }
}
