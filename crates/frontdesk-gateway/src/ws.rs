// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket subscriptions for queue viewers.
//!
//! `GET /ws?room=<resource_id>::<day>&key=<viewer key>`
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "connection.accepted", "room": "dr-lee::2026-03-14", "timestamp": "..."}
//! {"type": "queue.update", "room": "dr-lee::2026-03-14", "timestamp": "...", "stats": {...}}
//! ```
//! Client frames are ignored apart from close.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use frontdesk_bus::HubMessage;
use frontdesk_core::types::Scope;

use crate::server::GatewayState;

/// Query parameters for a viewer subscription.
#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub room: String,
    #[serde(default)]
    pub key: Option<String>,
}

/// WebSocket upgrade handler. Origin, key, and room are checked before the
/// upgrade is accepted.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Query(query): Query<SubscribeQuery>,
    headers: HeaderMap,
    State(state): State<GatewayState>,
) -> Response {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if let Err(status) = state.viewer.check(origin, query.key.as_deref()) {
        return status.into_response();
    }
    let scope = match Scope::from_room(&query.room) {
        Ok(scope) => scope,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, scope)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Pump hub frames to the socket until either side goes away.
async fn handle_socket(socket: WebSocket, state: GatewayState, scope: Scope) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let room = scope.room();
    let mut subscription = state.hub.subscribe(&room);
    let connection = subscription.id;

    // Snapshot for this viewer only; the handshake is already queued ahead of it.
    match state.service.stats(&scope).await {
        Ok(stats) => {
            if let Err(e) = state
                .hub
                .send_to(&room, connection, &HubMessage::queue_update(&room, stats))
            {
                tracing::debug!(room = %room, error = %e, "snapshot not delivered");
            }
        }
        Err(e) => tracing::warn!(room = %room, error = %e, "could not read snapshot stats"),
    }

    let mut sender_task = tokio::spawn(async move {
        while let Some(frame) = subscription.receiver.recv().await {
            if ws_sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                break;
            }
        }
    });

    // The sender ends when the hub drops this connection (pruned or stopped).
    loop {
        tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut sender_task => break,
        }
    }

    state.hub.unsubscribe(&room, connection);
    sender_task.abort();
}
