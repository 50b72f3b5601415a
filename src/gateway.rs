//! Webhook request pipeline.
//!
//! One pass per request: verify signature, parse, dispatch, format. The
//! pipeline is a pure function of `(signature, timestamp, raw body)` plus
//! configuration, with no knowledge of how it is hosted; the HTTP layer in
//! [`crate::server`] is a thin adapter over it.
//!
//! Verification runs against the exact bytes received, before any JSON
//! parsing. A request that fails it is rejected with no further
//! processing.

use axum::http::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::discord::{self, Interaction, InterpretError, ParsedInteraction};
use crate::dispatch::Dispatcher;

/// A fully formed reply: HTTP status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }
}

pub struct Gateway {
    public_key_hex: String,
    dispatcher: Dispatcher,
}

impl Gateway {
    pub fn new(public_key_hex: String, dispatcher: Dispatcher) -> Self {
        Self {
            public_key_hex,
            dispatcher,
        }
    }

    /// Handle one inbound delivery to completion.
    ///
    /// Every path terminates in exactly one reply: 401 for missing or
    /// invalid signatures, 400 for bodies that pass verification but
    /// violate the interaction schema, 200 for everything else, with
    /// command-level failures carried inside the 200 envelope.
    pub async fn handle(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> Reply {
        let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
            return Reply::error(StatusCode::UNAUTHORIZED, "Missing signature headers");
        };
        if body.is_empty() {
            return Reply::error(StatusCode::UNAUTHORIZED, "Missing signature headers");
        }

        if !discord::verify_signature(signature, timestamp, body, &self.public_key_hex) {
            warn!("rejected interaction with invalid signature");
            return Reply::error(StatusCode::UNAUTHORIZED, "Invalid signature");
        }

        // Only now is the body trusted enough to parse.
        let interaction: Interaction = match serde_json::from_slice(body) {
            Ok(interaction) => interaction,
            Err(err) => {
                debug!(error = %err, "interaction body failed to parse");
                return Reply::error(StatusCode::BAD_REQUEST, "Malformed request body");
            }
        };

        match discord::interpret(&interaction) {
            Ok(ParsedInteraction::Ping) => {
                debug!("acknowledging ping");
                Reply::ok(discord::response::pong())
            }
            Ok(ParsedInteraction::Command(command)) => {
                let outcome = self.dispatcher.dispatch(&command).await;
                Reply::ok(discord::response::message(&outcome))
            }
            Err(InterpretError::UnsupportedType(kind)) => {
                debug!(kind, "unsupported interaction type");
                Reply::error(StatusCode::BAD_REQUEST, "Unsupported interaction type")
            }
            Err(InterpretError::MissingCommandData) => {
                Reply::error(StatusCode::BAD_REQUEST, "Malformed request body")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::AllowList;
    use crate::compute::{ComputeResource, InstanceState, InstanceStatus, ResourceError};
    use ed25519_dalek::{Signer, SigningKey};
    use std::sync::Arc;

    struct StoppedCompute;

    #[async_trait::async_trait]
    impl ComputeResource for StoppedCompute {
        async fn describe(&self) -> Result<InstanceState, ResourceError> {
            Ok(InstanceState::bare(InstanceStatus::Stopped))
        }
        async fn start(&self) -> Result<(), ResourceError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), ResourceError> {
            Ok(())
        }
    }

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[9u8; 32])
    }

    fn gateway() -> Gateway {
        let dispatcher = Dispatcher::new(
            Arc::new(StoppedCompute),
            AllowList::default(),
            "valheim".into(),
            "valheim-server".into(),
        );
        Gateway::new(
            hex::encode(signing_key().verifying_key().to_bytes()),
            dispatcher,
        )
    }

    fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(signing_key().sign(&message).to_bytes())
    }

    #[tokio::test]
    async fn test_missing_headers_rejected() {
        let gw = gateway();

        let reply = gw.handle(None, Some("123"), b"{}").await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body, json!({"error": "Missing signature headers"}));

        let reply = gw.handle(Some("abcd"), None, b"{}").await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

        let reply = gw.handle(Some("abcd"), Some("123"), b"").await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body, json!({"error": "Missing signature headers"}));
    }

    #[tokio::test]
    async fn test_invalid_signature_rejected() {
        let gw = gateway();
        let body = br#"{"type":1}"#;
        let reply = gw
            .handle(Some(&"ab".repeat(64)), Some("123"), body)
            .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body, json!({"error": "Invalid signature"}));
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let gw = gateway();
        let body = br#"{"type":1}"#;
        let reply = gw
            .handle(Some(&sign("123", body)), Some("123"), body)
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({"type": 1}));
    }

    #[tokio::test]
    async fn test_malformed_body_after_valid_signature() {
        let gw = gateway();
        let body = b"not json at all";
        let reply = gw
            .handle(Some(&sign("123", body)), Some("123"), body)
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body, json!({"error": "Malformed request body"}));
    }

    #[tokio::test]
    async fn test_unsupported_interaction_type() {
        let gw = gateway();
        let body = br#"{"type":5}"#;
        let reply = gw
            .handle(Some(&sign("123", body)), Some("123"), body)
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body, json!({"error": "Unsupported interaction type"}));
    }

    #[tokio::test]
    async fn test_command_flows_to_dispatcher() {
        let gw = gateway();
        let body = br#"{"type":2,"data":{"name":"valheim_status"}}"#;
        let reply = gw
            .handle(Some(&sign("123", body)), Some("123"), body)
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["type"], 4);
        assert_eq!(
            reply.body["data"]["content"],
            "Server is currently **stopped**"
        );
    }
}
