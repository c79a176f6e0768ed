/// End-to-end tests for the moderation HTTP API
///
/// Each test runs the full router against a file-backed SQLite database in a
/// temp directory, with the clock pinned so dispatch slots are predictable.
use annonce_moderation::{
    config::{AppConfig, DispatchConfig, JobsConfig, LoggingConfig, ServiceConfig, StorageConfig},
    context::AppContext,
    db,
    moderation::{Clock, FixedClock, NewAnnouncement},
    server::build_router,
};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct Harness {
    app: Router,
    ctx: AppContext,
    clock: Arc<FixedClock>,
    _dir: TempDir,
}

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

async fn harness(now: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("moderation.sqlite");

    let config = AppConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".into(),
            port: 0,
            version: "test".into(),
        },
        storage: StorageConfig {
            database: database.clone(),
            max_connections: 2,
        },
        dispatch: DispatchConfig {
            hour: 18,
            utc_offset_seconds: Some(0),
        },
        jobs: JobsConfig::default(),
        logging: LoggingConfig {
            level: "debug".into(),
            json: false,
        },
    };

    let pool = db::create_pool(
        &database,
        db::DatabaseOptions {
            max_connections: 2,
            enable_wal: true,
        },
    )
    .await
    .unwrap();
    db::run_migrations(&pool).await.unwrap();

    let clock = Arc::new(FixedClock::new(at(now)));
    let ctx = AppContext::from_parts(config, pool, clock.clone()).unwrap();
    let app = build_router(ctx.clone());

    Harness {
        app,
        ctx,
        clock,
        _dir: dir,
    }
}

impl Harness {
    async fn seed(&self, network_id: &str, subject: &str) -> String {
        self.ctx
            .moderation_store
            .insert_moderation_record(
                NewAnnouncement {
                    network_id: network_id.into(),
                    sender_email: "dana@example.org".into(),
                    sender_name: Some("Dana".into()),
                    subject: subject.into(),
                    content: "Assemblée générale jeudi".into(),
                    category: None,
                },
                self.clock.now(),
            )
            .await
            .unwrap()
            .id
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

#[tokio::test]
async fn health_endpoints_respond() {
    let h = harness("2024-01-15T10:00:00Z").await;

    let (status, body) = h.request(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = h.request(Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn approve_then_read_back() {
    let h = harness("2024-01-15T17:59:59.999Z").await;
    let id = h.seed("net-1", "Fête de quartier").await;

    let (status, body) = h
        .request(
            Method::POST,
            &format!("/api/announcements/{}/moderate", id),
            Some(json!({ "status": "approved", "category": "events" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["scheduled_send_at"], "2024-01-15T18:00:00.000Z");
    assert_eq!(body["announcement"]["status"], "approved");
    assert_eq!(body["announcement"]["sync_state"], "awaiting_dispatch");

    let (status, body) = h
        .request(Method::GET, &format!("/api/announcements/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["category"], "events");
    assert_eq!(body["synced_to_sympa"], false);
    assert_eq!(
        body["scheduled_send_at"].as_str().map(at),
        Some(at("2024-01-15T18:00:00Z"))
    );
}

#[tokio::test]
async fn decision_after_cutoff_goes_to_tomorrow() {
    let h = harness("2024-01-15T23:00:00Z").await;
    let id = h.seed("net-1", "Late").await;

    let (status, body) = h
        .request(
            Method::POST,
            &format!("/api/announcements/{}/moderate", id),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scheduled_send_at"], "2024-01-16T18:00:00.000Z");
}

#[tokio::test]
async fn moderate_unknown_record_is_404() {
    let h = harness("2024-01-15T10:00:00Z").await;

    let (status, body) = h
        .request(
            Method::POST,
            "/api/announcements/missing/moderate",
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn invalid_status_is_400() {
    let h = harness("2024-01-15T10:00:00Z").await;
    let id = h.seed("net-1", "Bad input").await;

    let (status, body) = h
        .request(
            Method::POST,
            &format!("/api/announcements/{}/moderate", id),
            Some(json!({ "status": "published" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = h
        .request(
            Method::POST,
            &format!("/api/announcements/{}/moderate", id),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_version_is_409() {
    let h = harness("2024-01-15T10:00:00Z").await;
    let id = h.seed("net-1", "Contended").await;

    let (status, _) = h
        .request(
            Method::POST,
            &format!("/api/announcements/{}/moderate", id),
            Some(json!({ "status": "approved", "expected_version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .request(
            Method::POST,
            &format!("/api/announcements/{}/moderate", id),
            Some(json!({ "status": "rejected", "expected_version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, body) = h
        .request(Method::GET, &format!("/api/announcements/{}", id), None)
        .await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["version"], 2);
}

#[tokio::test]
async fn list_filters_and_summarises() {
    let h = harness("2024-01-15T10:00:00Z").await;
    let first = h.seed("net-1", "First").await;
    h.clock.advance(chrono::Duration::minutes(5));
    let second = h.seed("net-1", "Second").await;
    h.seed("net-2", "Elsewhere").await;

    h.request(
        Method::POST,
        &format!("/api/announcements/{}/moderate", first),
        Some(json!({ "status": "approved" })),
    )
    .await;
    h.ctx
        .moderation_store
        .mark_dispatched(&first, at("2024-01-15T18:00:01Z"))
        .await
        .unwrap();

    let (status, body) = h
        .request(Method::GET, "/api/networks/net-1/announcements", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["announcements"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], second.as_str());
    assert_eq!(items[1]["sync_state"], "sent");
    assert_eq!(body["summary"]["undecided"], 1);
    assert_eq!(body["summary"]["sent"], 1);

    let (_, body) = h
        .request(
            Method::GET,
            "/api/networks/net-1/announcements?status=pending",
            None,
        )
        .await;
    let items = body["announcements"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["subject"], "Second");
}

#[tokio::test]
async fn categories_create_duplicate_and_reorder() {
    let h = harness("2024-01-15T10:00:00Z").await;

    let (status, body) = h
        .request(
            Method::POST,
            "/api/networks/net-1/categories",
            Some(json!({ "name": "Événements" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let events = body["category"]["id"].as_str().unwrap().to_string();

    let (status, body) = h
        .request(
            Method::POST,
            "/api/networks/net-1/categories",
            Some(json!({ "name": "Jobs", "slug": "jobs" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["category"]["id"].as_str().unwrap().to_string();

    let (status, body) = h
        .request(
            Method::POST,
            "/api/networks/net-1/categories",
            Some(json!({ "name": "Other jobs", "slug": "jobs" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));

    let (status, body) = h
        .request(
            Method::POST,
            "/api/networks/net-1/categories/reorder",
            Some(json!({ "ordered_ids": [&jobs, &events] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"][0]["slug"], "jobs");

    let (status, _) = h
        .request(
            Method::POST,
            "/api/networks/net-1/categories/reorder",
            Some(json!({ "ordered_ids": [&events, "unknown"] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = h
        .request(Method::GET, "/api/networks/net-1/categories", None)
        .await;
    assert_eq!(body["categories"][0]["slug"], "jobs");
    assert_eq!(body["categories"][1]["slug"], "v-nements");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let h = harness("2024-01-15T10:00:00Z").await;
    let (status, body) = h.request(Method::GET, "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn mistyped_body_is_400_with_action_result() {
    let h = harness("2024-01-15T10:00:00Z").await;
    let id = h.seed("net-1", "Typed").await;

    let (status, body) = h
        .request(
            Method::POST,
            &format!("/api/announcements/{}/moderate", id),
            Some(json!({ "status": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Invalid request body"));

    let (status, body) = h
        .request(
            Method::POST,
            "/api/networks/net-1/categories/reorder",
            Some(json!({ "ordered_ids": "not-a-list" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Record untouched
    let (_, body) = h
        .request(Method::GET, &format!("/api/announcements/{}", id), None)
        .await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["version"], 1);
}

#[tokio::test]
async fn unparseable_body_is_400() {
    let h = harness("2024-01-15T10:00:00Z").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/networks/net-1/categories")
        .header("content-type", "application/json")
        .body(Body::from("{ name: "))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn partial_reorder_is_400() {
    let h = harness("2024-01-15T10:00:00Z").await;
    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        let (_, body) = h
            .request(
                Method::POST,
                "/api/networks/net-1/categories",
                Some(json!({ "name": name })),
            )
            .await;
        ids.push(body["category"]["id"].as_str().unwrap().to_string());
    }

    let (status, _) = h
        .request(
            Method::POST,
            "/api/networks/net-1/categories/reorder",
            Some(json!({ "ordered_ids": [&ids[1], &ids[1], &ids[0]] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = h
        .request(Method::GET, "/api/networks/net-1/categories", None)
        .await;
    let positions: Vec<_> = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["position"].as_i64().unwrap())
        .collect();
    assert_eq!(positions, vec![0, 1, 2]);
}
