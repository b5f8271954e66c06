//! Main entry point for the Polyglot Gate CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polyglot_gate::cli::commands::{self, Commands};

/// Polyglot Gate - translation gateway for LLM backends
#[derive(Parser, Debug)]
#[command(name = "polyglot-gate", version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("polyglot_gate={},tower_http={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Execute command
    match args.command {
        Some(Commands::Run { config }) => commands::handle_run(config).await?,
        Some(Commands::Gen { path }) => commands::handle_gen(path)?,
        Some(Commands::Valid { config }) => commands::handle_valid(config)?,
        Some(Commands::Version) => commands::handle_version(),
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
