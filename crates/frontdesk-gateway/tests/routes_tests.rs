// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driving the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use frontdesk_bus::{BroadcastHub, HubSettings};
use frontdesk_gateway::auth::{AuthConfig, ViewerPolicy};
use frontdesk_gateway::build_router;
use frontdesk_gateway::server::{GatewayState, HealthState};
use frontdesk_queue::{
    AdmissionPolicy, CapacityTable, ClinicCalendar, QueueService, QueueSettings, TokenService,
};
use frontdesk_test_utils::{ManualClock, MemoryQueueStore};

const STAFF: &str = "staff-token";
const QUEUE: &str = "/v1/queues/dr-lee/2026-03-14";

struct TestApp {
    router: Router,
    hub: Arc<BroadcastHub>,
}

fn app_with(max_per_day: u32) -> TestApp {
    let mut settings = QueueSettings::default();
    settings.admission = AdmissionPolicy::new(7, CapacityTable::new(max_per_day));
    let hub = Arc::new(BroadcastHub::new(HubSettings::default()));
    hub.start();
    let service = Arc::new(
        QueueService::new(
            Arc::new(MemoryQueueStore::new()),
            settings,
            TokenService::new(b"gateway-test-secret".to_vec(), ClinicCalendar::utc(), 6),
        )
        .with_clock(Arc::new(ManualClock::at(2026, 3, 14, 9, 0)))
        .with_notifier(hub.clone()),
    );
    let state = GatewayState {
        service,
        hub: Arc::clone(&hub),
        auth: AuthConfig {
            bearer_token: Some(STAFF.to_string()),
        },
        viewer: ViewerPolicy {
            viewer_key: Some("tv".to_string()),
            allowed_origins: vec!["https://clinic.example".to_string()],
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
        },
    };
    TestApp {
        router: build_router(state),
        hub,
    }
}

fn app() -> TestApp {
    app_with(50)
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn staff(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(method, uri, Some(STAFF), body).await
    }

    async fn token(&self) -> String {
        let (status, body) = self
            .staff(Method::POST, &format!("{QUEUE}/tokens"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn join(&self, token: &str, phone: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/v1/join",
            None,
            Some(json!({"token": token, "phone": phone})),
        )
        .await
    }

    async fn entry_ids(&self) -> Vec<i64> {
        let (_, body) = self
            .staff(Method::GET, &format!("{QUEUE}/entries"), None)
            .await;
        body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|e| !e["position"].is_null())
            .map(|e| e["id"].as_i64().unwrap())
            .collect()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "healthy");
    app.hub.stop().await;
}

#[tokio::test]
async fn staff_routes_fail_closed_without_bearer() {
    let app = app();
    let uri = format!("{QUEUE}/tokens");
    let (status, _) = app.call(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.call(Method::POST, &uri, Some("wrong"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.call(Method::GET, &format!("{QUEUE}/stats"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.staff(Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resource_id"], "dr-lee");
    assert_eq!(body["day"], "2026-03-14");
}

#[tokio::test]
async fn join_issues_then_deduplicates() {
    let app = app();
    let token = app.token().await;

    let (status, body) = app.join(&token, "5550001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["number"], 1);
    assert_eq!(body["duplicate"], false);
    assert_eq!(body["room"], "dr-lee::2026-03-14");

    let (_, body) = app.join(&token, "5550001").await;
    assert_eq!(body["number"], 1);
    assert_eq!(body["duplicate"], true);

    let (_, body) = app.staff(Method::GET, &format!("{QUEUE}/stats"), None).await;
    assert_eq!(body["stats"]["waiting"], 1);
    assert_eq!(body["stats"]["last_ticket"], 1);
}

#[tokio::test]
async fn join_errors_carry_codes() {
    let app = app_with(1);
    let token = app.token().await;

    let (status, body) = app.join("forged", "5550001").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "INVALID_TOKEN");

    let (status, body) = app
        .call(Method::POST, "/v1/join", None, Some(json!({"token": token})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION");

    app.join(&token, "5550001").await;
    let (status, body) = app.join(&token, "5550002").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "QUEUE_FULL");
    assert_eq!(body["detail"]["max_per_day"], 1);
    assert_eq!(body["detail"]["remaining"], 0);
}

#[tokio::test]
async fn open_service_closes_joining() {
    let app = app();
    let token = app.token().await;

    let (status, body) = app.staff(Method::POST, &format!("{QUEUE}/open"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_open"], false);
    assert!(body["opened_at"].is_string());

    let (_, body) = app.join(&token, "5550001").await;
    assert_eq!(body["error_code"], "QUEUE_CLOSED");
}

#[tokio::test]
async fn bad_day_in_path_is_validation() {
    let app = app();
    let (status, body) = app
        .staff(Method::GET, "/v1/queues/dr-lee/14-03-2026/stats", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION");
}

#[tokio::test]
async fn reorder_and_move_keep_positions_dense() {
    let app = app();
    let token = app.token().await;
    for i in 1..=5 {
        app.join(&token, &format!("555000{i}")).await;
    }
    let ids = app.entry_ids().await;

    let (status, _) = app
        .staff(
            Method::POST,
            &format!("/v1/entries/{}/move", ids[4]),
            Some(json!({"position": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.entry_ids().await, vec![ids[0], ids[4], ids[1], ids[2], ids[3]]);

    let (status, body) = app
        .staff(
            Method::PUT,
            &format!("{QUEUE}/order"),
            Some(json!({"order": [{"entry_id": ids[3], "position": 1}]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let positions: Vec<i64> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["position"].as_i64())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![1, 2, 3, 4, 5]);

    let (status, body) = app
        .staff(
            Method::POST,
            "/v1/entries/999/move",
            Some(json!({"position": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "NOT_FOUND");

    let (status, _) = app
        .staff(
            Method::PUT,
            &format!("{QUEUE}/order"),
            Some(json!({"order": [{"entry_id": ids[0], "position": 9}]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A stale view that names an entry no longer in line.
    let (status, body) = app
        .staff(
            Method::PUT,
            &format!("{QUEUE}/order"),
            Some(json!({"order": [{"entry_id": 999, "position": 1}]})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "CONFLICT");
}

#[tokio::test]
async fn status_transitions_over_http() {
    let app = app();
    let token = app.token().await;
    app.join(&token, "5550001").await;
    let id = app.entry_ids().await[0];
    let uri = format!("/v1/entries/{id}/status");

    let (status, body) = app
        .staff(Method::POST, &uri, Some(json!({"status": "called"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "called");
    assert!(body["called_at"].is_string());

    let (status, body) = app
        .staff(Method::POST, &uri, Some(json!({"status": "done"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "CONFLICT");

    let (status, _) = app
        .staff(Method::POST, &uri, Some(json!({"status": "teleported"})))
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn viewer_checks_run_before_upgrade() {
    let app = app();
    let request = |uri: &str, origin: Option<&str>| {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        builder.body(Body::empty()).unwrap()
    };

    let response = app
        .router
        .clone()
        .oneshot(request(
            "/ws?room=dr-lee::2026-03-14&key=tv",
            Some("https://evil.example"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .clone()
        .oneshot(request(
            "/ws?room=dr-lee::2026-03-14",
            Some("https://clinic.example"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(request(
            "/ws?room=not-a-room&key=tv",
            Some("https://clinic.example"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Authorized but not an upgrade request.
    let response = app
        .router
        .clone()
        .oneshot(request(
            "/ws?room=dr-lee::2026-03-14&key=tv",
            Some("https://clinic.example"),
        ))
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::FORBIDDEN);
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!response.status().is_success());
}

#[tokio::test]
async fn mutations_reach_room_subscribers() {
    let app = app();
    let mut sub = app.hub.subscribe("dr-lee::2026-03-14");
    let handshake = sub.receiver.recv().await.unwrap();
    assert!(handshake.contains("connection.accepted"));

    let token = app.token().await;
    app.join(&token, "5550001").await;

    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), sub.receiver.recv())
        .await
        .unwrap()
        .unwrap();
    let update: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(update["type"], "queue.update");
    assert_eq!(update["stats"]["last_ticket"], 1);
    app.hub.stop().await;
}
