// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Hivemind Coordinator CLI
//!
//! The `hivemind` binary hosts the command coordination engine and gives
//! operators a view into it.
//!
//! ## Commands
//!
//! - `hivemind config show|validate|generate` - Configuration management
//! - `hivemind fingerprint <tool> --args JSON` - Inspect a command's identity
//! - `hivemind cache get|list` - Inspect the result store

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use hivemind_cli::commands::{self, CacheCommand, ConfigCommand, FingerprintCommand};
use hivemind_core::domain::node_config::NodeConfigManifest;

/// Hivemind - coordinate identical commands across many agents
#[derive(Parser)]
#[command(name = "hivemind")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "HIVEMIND_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HIVEMIND_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Show the fingerprint of a tool invocation
    #[command(name = "fingerprint")]
    Fingerprint(FingerprintCommand),

    /// Inspect stored command results
    #[command(name = "cache")]
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging settings come from the manifest when it loads; a broken
    // manifest is reported by the command itself.
    let logging = NodeConfigManifest::load_or_default(cli.config.clone())
        .ok()
        .and_then(|c| c.spec.observability)
        .and_then(|o| o.logging);
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let json = logging.as_ref().is_some_and(|l| l.format == "json");
    init_logging(&level, json)?;

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Fingerprint(command)) => commands::fingerprint::execute(command),
        Some(Commands::Cache { command }) => {
            commands::cache::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
