//! AWS Lightsail adapter.
//!
//! Talks to the `Lightsail_20161128` JSON target endpoint directly over
//! HTTPS with SigV4-signed requests. Only three operations are used:
//! `GetInstance`, `StartInstance`, `StopInstance`, all keyed by the
//! configured instance name.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::sigv4::RequestSigner;
use super::{ComputeResource, InstanceState, InstanceStatus, ResourceError};

pub struct LightsailCompute {
    client: reqwest::Client,
    host: String,
    instance_name: String,
    signer: RequestSigner,
}

impl LightsailCompute {
    pub fn new(
        region: &str,
        instance_name: String,
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            host: format!("lightsail.{region}.amazonaws.com"),
            instance_name,
            signer: RequestSigner::new(
                access_key_id,
                secret_access_key,
                session_token,
                region.to_string(),
                "lightsail".to_string(),
            ),
        }
    }

    /// Issue one signed operation against the instance.
    async fn call(&self, operation: &str) -> Result<Value, ResourceError> {
        let body = serde_json::json!({ "instanceName": self.instance_name }).to_string();
        let target = format!("Lightsail_20161128.{operation}");
        let headers = self.signer.sign(&self.host, &target, body.as_bytes(), Utc::now());

        debug!(operation, instance = %self.instance_name, "calling Lightsail");

        let mut request = self
            .client
            .post(format!("https://{}/", self.host))
            .body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResourceError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ResourceError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(provider_error(&text));
        }
        serde_json::from_str(&text).map_err(|e| ResourceError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ComputeResource for LightsailCompute {
    async fn describe(&self) -> Result<InstanceState, ResourceError> {
        match self.call("GetInstance").await {
            Ok(value) => parse_instance(&value),
            // A missing instance is a state, not a fault.
            Err(ResourceError::NotFound(_)) => Ok(InstanceState::bare(InstanceStatus::NotFound)),
            Err(err) => Err(err),
        }
    }

    async fn start(&self) -> Result<(), ResourceError> {
        self.call("StartInstance").await.map(|_| ())
    }

    async fn stop(&self) -> Result<(), ResourceError> {
        self.call("StopInstance").await.map(|_| ())
    }
}

/// Classify a Lightsail error body. The JSON protocol reports a `__type`
/// exception name and a human-readable `message`; the message is what ends
/// up in chat.
fn provider_error(body: &str) -> ResourceError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let exception = parsed
        .as_ref()
        .and_then(|v| v.get("__type"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(Value::as_str)
        .unwrap_or("provider request failed")
        .to_string();

    if exception.contains("NotFoundException") {
        ResourceError::NotFound(message)
    } else {
        ResourceError::Api(message)
    }
}

fn parse_instance(value: &Value) -> Result<InstanceState, ResourceError> {
    let instance = value
        .get("instance")
        .ok_or_else(|| ResourceError::Parse("missing instance field".into()))?;

    let status = instance
        .pointer("/state/name")
        .and_then(Value::as_str)
        .map(normalize_status)
        .unwrap_or(InstanceStatus::Unknown);

    Ok(InstanceState {
        status,
        public_ip: instance
            .get("publicIpAddress")
            .and_then(Value::as_str)
            .map(str::to_string),
        instance_type: instance
            .get("bundleId")
            .and_then(Value::as_str)
            .map(str::to_string),
        launched_at: instance
            .get("createdAt")
            .and_then(Value::as_f64)
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
    })
}

/// Reduce Lightsail state names to the normalized status enum. `stopping`
/// counts as stopped: the instance is headed there and a start request in
/// that window fails at the provider, which surfaces as an error message.
fn normalize_status(name: &str) -> InstanceStatus {
    match name {
        "running" => InstanceStatus::Running,
        "pending" | "starting" => InstanceStatus::Pending,
        "stopped" | "stopping" => InstanceStatus::Stopped,
        _ => InstanceStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("running"), InstanceStatus::Running);
        assert_eq!(normalize_status("pending"), InstanceStatus::Pending);
        assert_eq!(normalize_status("starting"), InstanceStatus::Pending);
        assert_eq!(normalize_status("stopped"), InstanceStatus::Stopped);
        assert_eq!(normalize_status("stopping"), InstanceStatus::Stopped);
        assert_eq!(normalize_status("terminated"), InstanceStatus::Unknown);
    }

    #[test]
    fn test_parse_instance_full() {
        let value = serde_json::json!({
            "instance": {
                "name": "valheim-server",
                "state": {"code": 16, "name": "running"},
                "publicIpAddress": "1.2.3.4",
                "bundleId": "medium_2_0",
                "createdAt": 1700000000.0
            }
        });

        let state = parse_instance(&value).unwrap();
        assert_eq!(state.status, InstanceStatus::Running);
        assert_eq!(state.public_ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(state.instance_type.as_deref(), Some("medium_2_0"));
        assert_eq!(state.launched_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parse_instance_sparse() {
        let value = serde_json::json!({
            "instance": {"state": {"name": "stopped"}}
        });

        let state = parse_instance(&value).unwrap();
        assert_eq!(state.status, InstanceStatus::Stopped);
        assert_eq!(state.public_ip, None);
        assert_eq!(state.instance_type, None);
        assert_eq!(state.launched_at, None);
    }

    #[test]
    fn test_parse_instance_missing_field() {
        let value = serde_json::json!({"unexpected": true});
        assert!(matches!(
            parse_instance(&value),
            Err(ResourceError::Parse(_))
        ));
    }

    #[test]
    fn test_provider_error_classification() {
        let not_found = provider_error(
            r#"{"__type":"NotFoundException","message":"Instance \"valheim-server\" not found"}"#,
        );
        assert!(matches!(not_found, ResourceError::NotFound(_)));

        let denied = provider_error(
            r#"{"__type":"AccessDeniedException","message":"not authorized"}"#,
        );
        match denied {
            ResourceError::Api(message) => assert_eq!(message, "not authorized"),
            other => panic!("expected Api error, got {other:?}"),
        }

        let garbage = provider_error("<html>bad gateway</html>");
        assert!(matches!(garbage, ResourceError::Api(_)));
    }
}
