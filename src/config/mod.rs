//! Environment-loaded configuration.
//!
//! The gateway is configured entirely through environment variables, the
//! way its serverless ancestry demands. Values that only one subcommand
//! needs (bot token for registration, AWS credentials for serving) stay
//! optional here and are required at the point of use.

use serde::{Deserialize, Serialize};

use crate::authz::AllowList;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
}

/// Discord application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    /// Hex-encoded Ed25519 public key used to verify interaction
    /// signatures.
    pub public_key: Option<String>,
    /// Bot token, used only for command registration.
    pub bot_token: Option<String>,
    pub application_id: Option<String>,
    /// Guild for deployment-scoped registration (and guild-duplicate
    /// clearing during global registration).
    pub guild_id: Option<String>,
}

/// AWS settings for the Lightsail adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub discord: DiscordConfig,
    pub aws: AwsConfig,
    /// Name of the Lightsail instance under control.
    pub instance_name: String,
    /// Display identifier for the controlled game, used in command names
    /// and help text.
    pub game_name: String,
    /// Caller IDs permitted to start/stop. Empty means everyone.
    pub authorized_users: Vec<String>,
    pub bind: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "PORT",
                message: format!("expected a port number, got '{raw}'"),
            })?,
            Err(_) => 8080,
        };

        Ok(Self {
            discord: DiscordConfig {
                public_key: env_opt("DISCORD_PUBLIC_KEY"),
                bot_token: env_opt("DISCORD_BOT_TOKEN"),
                application_id: env_opt("DISCORD_APP_ID"),
                guild_id: env_opt("DISCORD_GUILD_ID"),
            },
            aws: AwsConfig {
                region: env_or("AWS_REGION", "eu-north-1"),
                access_key_id: env_opt("AWS_ACCESS_KEY_ID"),
                secret_access_key: env_opt("AWS_SECRET_ACCESS_KEY"),
                session_token: env_opt("AWS_SESSION_TOKEN"),
            },
            instance_name: env_or("INSTANCE_NAME", "valheim-server"),
            game_name: env_or("GAME_NAME", "valheim"),
            authorized_users: std::env::var("AUTHORIZED_USERS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            bind: env_or("BIND", "0.0.0.0"),
            port,
        })
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList::new(self.authorized_users.clone())
    }

    /// Values the webhook server cannot run without.
    pub fn require_serve(&self) -> Result<ServeConfig<'_>, ConfigError> {
        Ok(ServeConfig {
            public_key: self
                .discord
                .public_key
                .as_deref()
                .ok_or(ConfigError::MissingVar("DISCORD_PUBLIC_KEY"))?,
            access_key_id: self
                .aws
                .access_key_id
                .as_deref()
                .ok_or(ConfigError::MissingVar("AWS_ACCESS_KEY_ID"))?,
            secret_access_key: self
                .aws
                .secret_access_key
                .as_deref()
                .ok_or(ConfigError::MissingVar("AWS_SECRET_ACCESS_KEY"))?,
        })
    }

    /// Values command registration cannot run without.
    pub fn require_register(&self) -> Result<RegisterConfig<'_>, ConfigError> {
        Ok(RegisterConfig {
            bot_token: self
                .discord
                .bot_token
                .as_deref()
                .ok_or(ConfigError::MissingVar("DISCORD_BOT_TOKEN"))?,
            application_id: self
                .discord
                .application_id
                .as_deref()
                .ok_or(ConfigError::MissingVar("DISCORD_APP_ID"))?,
        })
    }
}

/// Borrowed view of the settings `serve` requires.
#[derive(Debug)]
pub struct ServeConfig<'a> {
    pub public_key: &'a str,
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
}

/// Borrowed view of the settings `register` requires.
#[derive(Debug)]
pub struct RegisterConfig<'a> {
    pub bot_token: &'a str,
    pub application_id: &'a str,
}

fn env_opt(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn env_or(var: &str, default: &str) -> String {
    env_opt(var).unwrap_or_else(|| default.to_string())
}
