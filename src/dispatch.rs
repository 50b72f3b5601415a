//! Command dispatch engine.
//!
//! Routes a normalized command through authorization and at most one
//! provider mutation, and reduces every branch to exactly one
//! [`ActionOutcome`]. Anticipated failures (denied caller, provider fault,
//! unknown command) become outcomes here; nothing below this layer talks to
//! the chat platform.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::authz::AllowList;
use crate::compute::{ComputeResource, InstanceStatus};
use crate::discord::{Action, NormalizedCommand};

/// The sole artifact handed to the response formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub ok: bool,
    pub message: String,
    pub visible_to_all: bool,
}

impl ActionOutcome {
    fn reply(message: impl Into<String>, visible_to_all: bool) -> Self {
        Self {
            ok: true,
            message: message.into(),
            visible_to_all,
        }
    }

    fn failure(message: impl Into<String>, visible_to_all: bool) -> Self {
        Self {
            ok: false,
            message: message.into(),
            visible_to_all,
        }
    }
}

pub struct Dispatcher {
    compute: Arc<dyn ComputeResource>,
    allow_list: AllowList,
    game_name: String,
    instance_name: String,
}

impl Dispatcher {
    pub fn new(
        compute: Arc<dyn ComputeResource>,
        allow_list: AllowList,
        game_name: String,
        instance_name: String,
    ) -> Self {
        Self {
            compute,
            allow_list,
            game_name,
            instance_name,
        }
    }

    /// Execute one command to completion. Every path returns an outcome;
    /// provider errors are reduced to their message text.
    pub async fn dispatch(&self, command: &NormalizedCommand) -> ActionOutcome {
        info!(
            command = %command.command_name,
            caller = command.caller_id.as_deref().unwrap_or("unknown"),
            "dispatching command"
        );

        if !self
            .allow_list
            .permits(command.caller_id.as_deref(), command.action)
        {
            warn!(
                command = %command.command_name,
                caller = command.caller_id.as_deref().unwrap_or("unknown"),
                "caller not in allow-list"
            );
            let verb = if command.action == Action::Stop {
                "stop"
            } else {
                "start"
            };
            return ActionOutcome::failure(
                format!("Sorry, you don't have permission to {verb} the server."),
                true,
            );
        }

        match command.action {
            Action::Status => self.handle_status().await,
            Action::Start => self.handle_start().await,
            Action::Stop => self.handle_stop().await,
            Action::Help => ActionOutcome::reply(self.help_text(), false),
            Action::Unknown => ActionOutcome::failure(
                format!("Unknown command: {}", command.command_name),
                true,
            ),
        }
    }

    async fn handle_status(&self) -> ActionOutcome {
        let state = match self.compute.describe().await {
            Ok(state) => state,
            Err(err) => {
                error!(error = %err, "status check failed");
                return ActionOutcome::failure(
                    format!("Error checking server status: {err}"),
                    false,
                );
            }
        };

        match state.status {
            InstanceStatus::NotFound => ActionOutcome::failure(
                format!(
                    "Instance '{}' was not found. Check the instance name in the deployment configuration.",
                    self.instance_name
                ),
                false,
            ),
            InstanceStatus::Running => {
                let mut details = Vec::new();
                if let Some(ip) = &state.public_ip {
                    details.push(format!("IP: {ip}"));
                }
                if let Some(instance_type) = &state.instance_type {
                    details.push(format!("type: {instance_type}"));
                }
                if let Some(launched_at) = state.launched_at {
                    details.push(format!("up {}", uptime_phrase(launched_at, Utc::now())));
                }
                let message = if details.is_empty() {
                    "Server is currently **running**".to_string()
                } else {
                    format!("Server is currently **running** ({})", details.join(", "))
                };
                ActionOutcome::reply(message, false)
            }
            status => {
                ActionOutcome::reply(format!("Server is currently **{status}**"), false)
            }
        }
    }

    /// Start is idempotent from the caller's view: a server already running
    /// or mid-start never triggers a second provision request. The state
    /// read is a snapshot, so overlapping starts degrade to two provider
    /// start requests, which Lightsail itself treats as a no-op.
    async fn handle_start(&self) -> ActionOutcome {
        match self.compute.describe().await {
            Ok(state) if state.status == InstanceStatus::Running => {
                let location = state
                    .public_ip
                    .map(|ip| format!(" at {ip}"))
                    .unwrap_or_default();
                ActionOutcome::reply(format!("Server is already running{location}."), true)
            }
            Ok(state) if state.status == InstanceStatus::Pending => ActionOutcome::reply(
                "Server is already starting. Give it a couple of minutes.",
                true,
            ),
            Ok(_) => match self.compute.start().await {
                Ok(()) => ActionOutcome::reply(
                    "Server is starting. It will take approximately 2-3 minutes to be available.",
                    true,
                ),
                Err(err) => {
                    error!(error = %err, "start request failed");
                    ActionOutcome::failure(format!("Error starting server: {err}"), true)
                }
            },
            Err(err) => {
                error!(error = %err, "state check before start failed");
                ActionOutcome::failure(format!("Error starting server: {err}"), true)
            }
        }
    }

    /// Stop skips the state check entirely: stopping an already-stopped
    /// instance is a safe no-op at the provider.
    async fn handle_stop(&self) -> ActionOutcome {
        match self.compute.stop().await {
            Ok(()) => ActionOutcome::reply(
                "Server is stopping. Thank you for saving server costs!",
                true,
            ),
            Err(err) => {
                error!(error = %err, "stop request failed");
                ActionOutcome::failure(format!("Error stopping server: {err}"), true)
            }
        }
    }

    fn help_text(&self) -> String {
        let game = &self.game_name;
        format!(
            "**Available Commands**:\n\
             • `/{game}_status` - Check if the server is running\n\
             • `/{game}_start` - Start the server\n\
             • `/{game}_stop` - Stop the server\n\
             • `/{game}_help` - Show this help message"
        )
    }
}

/// Elapsed time since launch, floored to whole minutes.
fn uptime_phrase(launched_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - launched_at).num_minutes().max(0);
    match minutes {
        0 => "less than a minute".to_string(),
        1 => "1 minute".to_string(),
        n => format!("{n} minutes"),
    }
}
