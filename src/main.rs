use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use cotacao::core::log::init_logging;

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

impl From<Commands> for cotacao::AppCommand {
    fn from(cmd: Commands) -> cotacao::AppCommand {
        match cmd {
            Commands::Server => cotacao::AppCommand::Server,
            Commands::Client => cotacao::AppCommand::Client,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Serve the USD-BRL quote on /cotacao
    Server,
    /// Fetch the quote from the server and write it to a file
    Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => cotacao::cli::setup::setup(),
        Some(cmd) => cotacao::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
