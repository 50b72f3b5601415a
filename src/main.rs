use clap::Parser;
use tracing_subscriber::EnvFilter;

use longship::cli::{self, Cli, Command};
use longship::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = Config::from_env()?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => cli::handle_serve(&config).await,
        Command::Register { global, grouped } => {
            cli::handle_register(&config, global, grouped).await
        }
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    }
}
