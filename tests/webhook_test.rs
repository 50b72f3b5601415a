//! End-to-end webhook tests.
//!
//! Drives the real router with signed HTTP requests: signatures come from a
//! fixed Ed25519 keypair so the verification path is exercised for real,
//! and the compute resource is a scripted fake recording every call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Value};
use tower::ServiceExt;

use longship::authz::AllowList;
use longship::compute::{ComputeResource, InstanceState, InstanceStatus, ResourceError};
use longship::dispatch::Dispatcher;
use longship::gateway::Gateway;
use longship::server;

const TEST_SEED: [u8; 32] = [7u8; 32];

#[derive(Default)]
struct FakeCompute {
    state: Option<InstanceState>,
    describe_error: Option<String>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ComputeResource for FakeCompute {
    async fn describe(&self) -> Result<InstanceState, ResourceError> {
        if let Some(message) = &self.describe_error {
            return Err(ResourceError::Api(message.clone()));
        }
        Ok(self
            .state
            .clone()
            .unwrap_or_else(|| InstanceState::bare(InstanceStatus::Stopped)))
    }

    async fn start(&self) -> Result<(), ResourceError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ResourceError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&TEST_SEED)
}

fn public_key_hex() -> String {
    hex::encode(signing_key().verifying_key().to_bytes())
}

fn sign(timestamp: &str, body: &str) -> String {
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    hex::encode(signing_key().sign(&message).to_bytes())
}

fn test_app(compute: Arc<FakeCompute>, allow: AllowList) -> Router {
    let dispatcher = Dispatcher::new(compute, allow, "valheim".into(), "valheim-server".into());
    server::router(Arc::new(Gateway::new(public_key_hex(), dispatcher)))
}

fn signed_request(body: &str) -> Request<Body> {
    let timestamp = "1700000000";
    Request::builder()
        .method("POST")
        .uri("/interactions")
        .header("X-Signature-Ed25519", sign(timestamp, body))
        .header("X-Signature-Timestamp", timestamp)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn status_command() -> String {
    json!({"type": 2, "data": {"name": "valheim_status"}, "member": {"user": {"id": "caller-1"}}})
        .to_string()
}

#[tokio::test]
async fn test_status_of_running_server() {
    let compute = Arc::new(FakeCompute {
        state: Some(InstanceState {
            status: InstanceStatus::Running,
            public_ip: Some("1.2.3.4".into()),
            instance_type: Some("t3.small".into()),
            launched_at: Some(Utc::now() - Duration::milliseconds(600_000)),
        }),
        ..Default::default()
    });
    let app = test_app(Arc::clone(&compute), AllowList::default());

    let (status, body) = response_json(app, signed_request(&status_command())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], 4);
    let content = body["data"]["content"].as_str().unwrap();
    assert!(content.contains("running"), "content: {content}");
    assert!(content.contains("1.2.3.4"));
    assert!(content.contains("t3.small"));
    assert!(content.contains("10 minutes"));
    // Status replies stay private to the caller.
    assert_eq!(body["data"]["flags"], 64);
}

#[tokio::test]
async fn test_missing_signature_headers() {
    let app = test_app(Arc::new(FakeCompute::default()), AllowList::default());

    let request = Request::builder()
        .method("POST")
        .uri("/interactions")
        .body(Body::from(status_command()))
        .unwrap();
    let (status, body) = response_json(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Missing signature headers"}));
}

#[tokio::test]
async fn test_invalid_signature() {
    let app = test_app(Arc::new(FakeCompute::default()), AllowList::default());

    let body = status_command();
    let request = Request::builder()
        .method("POST")
        .uri("/interactions")
        .header("X-Signature-Ed25519", "ab".repeat(64))
        .header("X-Signature-Timestamp", "1700000000")
        .body(Body::from(body))
        .unwrap();
    let (status, body) = response_json(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid signature"}));
}

#[tokio::test]
async fn test_tampered_body_is_rejected() {
    let app = test_app(Arc::new(FakeCompute::default()), AllowList::default());

    // Signature covers the original body; the delivered body differs.
    let original = status_command();
    let timestamp = "1700000000";
    let request = Request::builder()
        .method("POST")
        .uri("/interactions")
        .header("X-Signature-Ed25519", sign(timestamp, &original))
        .header("X-Signature-Timestamp", timestamp)
        .body(Body::from(original.replace("valheim_status", "valheim_stopXX")))
        .unwrap();
    let (status, _) = response_json(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ping_acknowledged() {
    let app = test_app(Arc::new(FakeCompute::default()), AllowList::default());

    let (status, body) = response_json(app, signed_request(r#"{"type":1}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"type": 1}));
}

#[tokio::test]
async fn test_lowercase_signature_headers_accepted() {
    let compute = Arc::new(FakeCompute::default());
    let app = test_app(compute, AllowList::default());

    let body = r#"{"type":1}"#;
    let timestamp = "1700000000";
    let request = Request::builder()
        .method("POST")
        .uri("/interactions")
        .header("x-signature-ed25519", sign(timestamp, body))
        .header("x-signature-timestamp", timestamp)
        .body(Body::from(body))
        .unwrap();
    let (status, _) = response_json(app, request).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unauthorized_stop_never_reaches_provider() {
    let compute = Arc::new(FakeCompute::default());
    let app = test_app(Arc::clone(&compute), AllowList::from_csv("someone-else"));

    let body = json!({
        "type": 2,
        "data": {"name": "valheim_stop"},
        "member": {"user": {"id": "caller-1"}}
    })
    .to_string();
    let (status, reply) = response_json(app, signed_request(&body)).await;

    assert_eq!(status, StatusCode::OK);
    let content = reply["data"]["content"].as_str().unwrap();
    assert!(content.contains("permission"), "content: {content}");
    assert_eq!(compute.stop_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_provider_fault_becomes_chat_message() {
    let compute = Arc::new(FakeCompute {
        describe_error: Some("connection reset by peer".into()),
        ..Default::default()
    });
    let app = test_app(compute, AllowList::default());

    let (status, reply) = response_json(app, signed_request(&status_command())).await;

    assert_eq!(status, StatusCode::OK);
    let content = reply["data"]["content"].as_str().unwrap();
    assert!(
        content.contains("connection reset by peer"),
        "content: {content}"
    );
}

#[tokio::test]
async fn test_start_from_stopped() {
    let compute = Arc::new(FakeCompute::default());
    let app = test_app(Arc::clone(&compute), AllowList::default());

    let body = json!({
        "type": 2,
        "data": {"name": "valheim_start"},
        "member": {"user": {"id": "caller-1"}}
    })
    .to_string();
    let (status, reply) = response_json(app, signed_request(&body)).await;

    assert_eq!(status, StatusCode::OK);
    let content = reply["data"]["content"].as_str().unwrap();
    assert!(content.contains("starting"), "content: {content}");
    // Start/stop results are announced to the whole channel.
    assert!(reply["data"].get("flags").is_none());
    assert_eq!(compute.start_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_start_is_idempotent() {
    let compute = Arc::new(FakeCompute {
        state: Some(InstanceState {
            status: InstanceStatus::Running,
            public_ip: Some("5.6.7.8".into()),
            instance_type: None,
            launched_at: None,
        }),
        ..Default::default()
    });
    let app = test_app(Arc::clone(&compute), AllowList::default());

    let body = json!({
        "type": 2,
        "data": {"name": "valheim_start"},
        "member": {"user": {"id": "caller-1"}}
    })
    .to_string();

    let (_, first) = response_json(app.clone(), signed_request(&body)).await;
    let (_, second) = response_json(app, signed_request(&body)).await;

    assert_eq!(compute.start_calls.load(Ordering::SeqCst), 0);
    assert_eq!(first["data"]["content"], "Server is already running at 5.6.7.8.");
    assert_eq!(first["data"]["content"], second["data"]["content"]);
}

#[tokio::test]
async fn test_grouped_command_shape() {
    let compute = Arc::new(FakeCompute::default());
    let app = test_app(Arc::clone(&compute), AllowList::default());

    let body = json!({
        "type": 2,
        "data": {
            "name": "server",
            "options": [
                {"name": "valheim", "options": [{"name": "stop"}]}
            ]
        },
        "member": {"user": {"id": "caller-1"}}
    })
    .to_string();
    let (status, reply) = response_json(app, signed_request(&body)).await;

    assert_eq!(status, StatusCode::OK);
    let content = reply["data"]["content"].as_str().unwrap();
    assert!(content.contains("stopping"), "content: {content}");
    assert_eq!(compute.stop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_command_is_answered_not_failed() {
    let app = test_app(Arc::new(FakeCompute::default()), AllowList::default());

    let body = json!({"type": 2, "data": {"name": "valheim_dance"}}).to_string();
    let (status, reply) = response_json(app, signed_request(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["data"]["content"], "Unknown command: valheim_dance");
}

#[tokio::test]
async fn test_malformed_body_with_valid_signature() {
    let app = test_app(Arc::new(FakeCompute::default()), AllowList::default());

    let (status, body) = response_json(app, signed_request("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Malformed request body"}));
}
