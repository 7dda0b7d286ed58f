use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use xconv::AppCommand;
use xconv::cli::convert::{ConvertArgs, parse_amount};
use xconv::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the rate relay and conversion recording service
    Serve,
    /// Convert an amount using the latest rates
    Convert {
        /// Amount to convert
        #[arg(value_parser = parse_amount)]
        amount: Option<f64>,
        /// Source currency code
        from: Option<String>,
        /// Target currency code
        to: Option<String>,
    },
    /// Start an interactive converter session
    Interactive {
        /// Source currency code
        #[arg(long)]
        from: Option<String>,
        /// Target currency code
        #[arg(long)]
        to: Option<String>,
    },
    /// Display the rate table for a base currency
    Rates {
        /// Base currency code
        base: Option<String>,
    },
    /// Display saved conversions
    History {
        /// Show only the most recent entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Serve => AppCommand::Serve,
            Commands::Convert { amount, from, to } => AppCommand::Convert(ConvertArgs {
                amount,
                from: from.map(|code| code.to_uppercase()),
                to: to.map(|code| code.to_uppercase()),
            }),
            Commands::Interactive { from, to } => AppCommand::Interactive(ConvertArgs {
                amount: None,
                from: from.map(|code| code.to_uppercase()),
                to: to.map(|code| code.to_uppercase()),
            }),
            Commands::Rates { base } => AppCommand::Rates {
                base: base.map(|code| code.to_uppercase()),
            },
            Commands::History { limit } => AppCommand::History { limit },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, matches!(cli.command, Some(Commands::Serve)));

    let result = match cli.command {
        Some(Commands::Setup) => xconv::cli::setup::setup(),
        Some(cmd) => xconv::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
