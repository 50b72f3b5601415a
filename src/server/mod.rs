//! HTTP hosting for the webhook pipeline.
//!
//! A thin axum adapter over [`Gateway`](crate::gateway::Gateway): it pulls
//! the signature headers and raw body out of the request, hands them to the
//! pipeline, and writes the reply back. Anything that escapes the pipeline
//! unexpectedly is caught here and becomes a 500.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::FutureExt;
use serde_json::json;
use tracing::{error, info};

use crate::gateway::Gateway;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid bind address: {0}")]
    Bind(String),
    #[error("server error: {0}")]
    Io(String),
}

/// Build the interactions router.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/interactions", post(interactions_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { gateway })
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, port: u16, gateway: Arc<Gateway>) -> Result<(), ServeError> {
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .map_err(|e: std::net::AddrParseError| ServeError::Bind(e.to_string()))?;

    let app = router(gateway);

    info!(address = %addr, "starting interactions server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServeError::Io(e.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ServeError::Io(e.to_string()))?;

    Ok(())
}

async fn interactions_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // HeaderMap lookups are case-insensitive, matching the platform's
    // freedom to deliver either header casing.
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let timestamp = headers.get(TIMESTAMP_HEADER).and_then(|v| v.to_str().ok());

    let handled = AssertUnwindSafe(state.gateway.handle(signature, timestamp, &body))
        .catch_unwind()
        .await;

    match handled {
        Ok(reply) => (reply.status, Json(reply.body)),
        Err(_) => {
            error!("interaction handler panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
