//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `serve` (default) -- run the interactions webhook server
//! - `register` -- publish the slash-command schema to Discord
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};

/// Longship slash-command gateway for a self-hosted game server.
#[derive(Parser, Debug)]
#[command(
    name = "longship",
    version = env!("CARGO_PKG_VERSION"),
    about = "Longship — Discord gateway for a cloud-hosted game server"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the interactions webhook server (default when no subcommand is
    /// given).
    Serve,

    /// Publish the slash-command schema to Discord.
    Register {
        /// Register globally instead of for the configured guild. Also
        /// clears guild-scoped duplicates, best-effort.
        #[arg(long)]
        global: bool,

        /// Publish the grouped `/server <game> <action>` shape instead of
        /// the flat `<game>_<action>` commands.
        #[arg(long)]
        grouped: bool,
    },

    /// Print version, build date, and git commit information.
    Version,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use std::sync::Arc;

use crate::compute::LightsailCompute;
use crate::config::Config;
use crate::discord::{CommandRegistrar, CommandShape};
use crate::dispatch::Dispatcher;
use crate::gateway::Gateway;
use crate::server;

/// Run the `serve` subcommand.
pub async fn handle_serve(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let required = config.require_serve()?;

    let compute = LightsailCompute::new(
        &config.aws.region,
        config.instance_name.clone(),
        required.access_key_id.to_string(),
        required.secret_access_key.to_string(),
        config.aws.session_token.clone(),
    );
    let dispatcher = Dispatcher::new(
        Arc::new(compute),
        config.allow_list(),
        config.game_name.clone(),
        config.instance_name.clone(),
    );
    let gateway = Arc::new(Gateway::new(required.public_key.to_string(), dispatcher));

    tracing::info!(
        instance = %config.instance_name,
        region = %config.aws.region,
        restricted = !config.authorized_users.is_empty(),
        "gateway configured"
    );

    server::serve(&config.bind, config.port, gateway).await?;
    Ok(())
}

/// Run the `register` subcommand.
pub async fn handle_register(
    config: &Config,
    global: bool,
    grouped: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let required = config.require_register()?;
    let registrar = CommandRegistrar::new(
        required.bot_token.to_string(),
        required.application_id.to_string(),
    );
    let shape = if grouped {
        CommandShape::Grouped
    } else {
        CommandShape::Flat
    };

    let count = if global {
        registrar
            .register_global(&config.game_name, shape, config.discord.guild_id.as_deref())
            .await?
    } else {
        let guild_id = config
            .discord
            .guild_id
            .as_deref()
            .ok_or(crate::config::ConfigError::MissingVar("DISCORD_GUILD_ID"))?;
        registrar
            .register_guild(guild_id, &config.game_name, shape)
            .await?
    };

    println!("Registered {} commands", count);
    if global {
        println!("Note: global commands can take up to an hour to appear in all servers");
    }
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("longship {}", env!("CARGO_PKG_VERSION"));
    println!("  commit: {}", env!("LONGSHIP_GIT_HASH"));
    println!("  built:  {}", env!("LONGSHIP_BUILD_DATE"));
}
