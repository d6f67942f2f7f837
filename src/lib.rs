pub mod cli;
pub mod client;
pub mod core;
pub mod providers;
pub mod server;
pub mod store;

use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Server,
    Client,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => core::config::AppConfig::load_from_path(path)?,
        None => core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Server => {
            info!("Rate server starting...");
            server::run(&config.server).await
        }
        AppCommand::Client => {
            client::run(&config.client).await?;
            Ok(())
        }
    }
}
