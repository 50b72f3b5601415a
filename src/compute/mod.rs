//! Compute resource abstraction.
//!
//! The gateway controls exactly one remote instance, exposed as an injected
//! capability so the dispatch engine never sees provider-specific shapes
//! and tests can substitute a scripted fake.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod lightsail;
pub mod sigv4;

pub use lightsail::LightsailCompute;

/// Normalized lifecycle state of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Running,
    Stopped,
    Pending,
    /// The configured instance does not exist in the provider's inventory.
    NotFound,
    Unknown,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InstanceStatus::Running => "running",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Pending => "pending",
            InstanceStatus::NotFound => "not found",
            InstanceStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Point-in-time snapshot of the instance. Never cached; staleness would
/// make the "already running" short-circuit lie to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceState {
    pub status: InstanceStatus,
    pub public_ip: Option<String>,
    pub instance_type: Option<String>,
    pub launched_at: Option<DateTime<Utc>>,
}

impl InstanceState {
    pub fn bare(status: InstanceStatus) -> Self {
        Self {
            status,
            public_ip: None,
            instance_type: None,
            launched_at: None,
        }
    }
}

/// Provider-level failure, reduced to a message that is safe to show in
/// chat.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Api(String),
    #[error("{0}")]
    NotFound(String),
    #[error("unexpected provider response: {0}")]
    Parse(String),
}

/// One remote compute instance with an asynchronous lifecycle.
///
/// `start` and `stop` request a transition and return without waiting for
/// it to complete; the provider finishes it on its own over a few minutes.
/// Both are idempotent at the provider level, so repeated requests are
/// safe.
#[async_trait]
pub trait ComputeResource: Send + Sync {
    /// Fetch a fresh snapshot. An instance absent from the provider's
    /// inventory yields [`InstanceStatus::NotFound`], not an error.
    async fn describe(&self) -> Result<InstanceState, ResourceError>;

    /// Request a transition toward `running`.
    async fn start(&self) -> Result<(), ResourceError>;

    /// Request a transition toward `stopped`.
    async fn stop(&self) -> Result<(), ResourceError>;
}
