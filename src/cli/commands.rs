//! CLI command definitions and handlers

use anyhow::Context;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::config::GatewayConfig;
use crate::core::registry::Registry;

/// Example configuration written by `gen`
pub const EXAMPLE_CONFIG: &str = include_str!("../../config_example.toml");

/// Commands for Polyglot Gate
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the translation gateway
    Run {
        /// Path to the TOML configuration file
        config: PathBuf,
    },

    /// Generate an example configuration file
    Gen {
        /// Where to write the example (must not exist)
        path: PathBuf,
    },

    /// Validate a configuration file
    Valid {
        /// Path to the TOML configuration file
        config: PathBuf,
    },

    /// Print version information
    Version,
}

/// Handle run command
pub async fn handle_run(config: PathBuf) -> anyhow::Result<()> {
    use crate::server::api::run_server;

    let config = GatewayConfig::load(&config)?;

    info!("Starting HTTP server on {}:{}", config.host, config.port);
    println!("🚀 Server starting on http://{}:{}", config.host, config.port);

    run_server(config).await
}

/// Handle gen command
pub fn handle_gen(path: PathBuf) -> anyhow::Result<()> {
    write_example_config(&path)?;
    println!("✅ Example config written to {}", path.display());
    Ok(())
}

/// Write the example configuration, refusing to overwrite
pub fn write_example_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("file already exists: {}", path.display());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            info!("Creating directory {}", dir.display());
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
    }

    info!("Writing example config file {}", path.display());
    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Handle valid command
pub fn handle_valid(config: PathBuf) -> anyhow::Result<()> {
    let config = GatewayConfig::load(&config)?;
    let registry = Registry::from_configs(config.backend_configs()?)?;

    println!("✅ Config is valid");
    println!("   Backends: {}", registry.len());
    for route in registry.list_routes() {
        println!("   - {}", route);
    }
    Ok(())
}

/// Handle version command
pub fn handle_version() {
    println!("{} {}", crate::NAME, crate::VERSION);
    println!("A translation gateway that routes requests to rate-limited, cached LLM backends.");
}
