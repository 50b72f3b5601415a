//! Slash-command registration.
//!
//! Publishes the command schema to Discord, out-of-band from request
//! handling. Commands can be registered globally or scoped to a single
//! guild, in either the flat legacy shape (`/valheim_status`, ...) or the
//! grouped shape (`/server valheim status`).

use serde_json::{json, Value};
use tracing::{info, warn};

/// Option type code for a sub-command.
const OPTION_TYPE_SUB_COMMAND: u8 = 1;
/// Option type code for a sub-command group.
const OPTION_TYPE_SUB_COMMAND_GROUP: u8 = 2;

/// Which command schema shape to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandShape {
    /// Four standalone commands named `<game>_<action>`.
    Flat,
    /// One `server` root command with a `<game>` sub-command group.
    Grouped,
}

/// Registration failures.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("network error: {0}")]
    Network(String),
    #[error("Discord API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
}

/// Client for the command-registration endpoints of the Discord API.
pub struct CommandRegistrar {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
    application_id: String,
}

impl CommandRegistrar {
    pub fn new(bot_token: String, application_id: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            api_url: "https://discord.com/api/v10".to_string(),
            bot_token,
            application_id,
        }
    }

    /// Override the API base URL, for tests.
    #[cfg(test)]
    fn with_api_url(mut self, url: String) -> Self {
        self.api_url = url;
        self
    }

    /// Register the command schema globally.
    ///
    /// When a guild is supplied, any guild-scoped duplicates are cleared
    /// first, best-effort: a failure to clear is logged and registration
    /// proceeds anyway.
    pub async fn register_global(
        &self,
        game: &str,
        shape: CommandShape,
        guild_to_clear: Option<&str>,
    ) -> Result<usize, RegisterError> {
        if let Some(guild_id) = guild_to_clear {
            if let Err(err) = self.clear_guild_commands(guild_id).await {
                warn!(guild = %guild_id, error = %err, "failed to clear guild commands, continuing with global registration");
            }
        }

        let route = format!("applications/{}/commands", self.application_id);
        let count = self.put_commands(&route, command_schema(game, shape)).await?;
        info!(count, "registered global commands");
        Ok(count)
    }

    /// Register the command schema for a single guild.
    pub async fn register_guild(
        &self,
        guild_id: &str,
        game: &str,
        shape: CommandShape,
    ) -> Result<usize, RegisterError> {
        let route = format!(
            "applications/{}/guilds/{}/commands",
            self.application_id, guild_id
        );
        let count = self.put_commands(&route, command_schema(game, shape)).await?;
        info!(guild = %guild_id, count, "registered guild commands");
        Ok(count)
    }

    /// Delete all guild-scoped commands by replacing them with an empty set.
    pub async fn clear_guild_commands(&self, guild_id: &str) -> Result<(), RegisterError> {
        let route = format!(
            "applications/{}/guilds/{}/commands",
            self.application_id, guild_id
        );
        self.put_commands(&route, json!([])).await?;
        Ok(())
    }

    /// PUT a command list, fully replacing whatever is registered at the
    /// route. Returns the number of commands Discord reports back.
    async fn put_commands(&self, route: &str, commands: Value) -> Result<usize, RegisterError> {
        let response = self
            .client
            .put(format!("{}/{}", self.api_url, route))
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&commands)
            .send()
            .await
            .map_err(|e| RegisterError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RegisterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let registered: Vec<Value> = response
            .json()
            .await
            .map_err(|e| RegisterError::Parse(e.to_string()))?;
        Ok(registered.len())
    }
}

/// Build the command list for the given shape.
fn command_schema(game: &str, shape: CommandShape) -> Value {
    match shape {
        CommandShape::Flat => json!([
            {
                "name": format!("{game}_status"),
                "description": format!("Check if the {game} server is running"),
            },
            {
                "name": format!("{game}_start"),
                "description": format!("Start the {game} server"),
            },
            {
                "name": format!("{game}_stop"),
                "description": format!("Stop the {game} server"),
            },
            {
                "name": format!("{game}_help"),
                "description": format!("Show available commands for the {game} server"),
            },
        ]),
        CommandShape::Grouped => json!([
            {
                "name": "server",
                "description": "Manage game servers",
                "options": [
                    {
                        "type": OPTION_TYPE_SUB_COMMAND_GROUP,
                        "name": game,
                        "description": format!("Manage the {game} server"),
                        "options": [
                            {
                                "type": OPTION_TYPE_SUB_COMMAND,
                                "name": "status",
                                "description": "Check if the server is running",
                            },
                            {
                                "type": OPTION_TYPE_SUB_COMMAND,
                                "name": "start",
                                "description": "Start the server",
                            },
                            {
                                "type": OPTION_TYPE_SUB_COMMAND,
                                "name": "stop",
                                "description": "Stop the server",
                            },
                            {
                                "type": OPTION_TYPE_SUB_COMMAND,
                                "name": "help",
                                "description": "Show available commands",
                            },
                        ],
                    }
                ],
            }
        ]),
    }
}
