pub mod cli;
pub mod client;
pub mod core;
pub mod providers;
pub mod server;
pub mod store;

use crate::cli::convert::ConvertArgs;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Serve,
    Convert(ConvertArgs),
    Interactive(ConvertArgs),
    Rates { base: Option<String> },
    History { limit: Option<usize> },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = AppConfig::resolve(config_path)?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Serve => {
            info!("xconv service starting...");
            server::serve(&config).await
        }
        AppCommand::Convert(args) => cli::convert::convert(&config, &args).await,
        AppCommand::Interactive(args) => cli::interactive::run(&config, &args).await,
        AppCommand::Rates { base } => cli::rates::show_rates(&config, base.as_deref()).await,
        AppCommand::History { limit } => cli::history::show_history(&config, limit).await,
    }
}
