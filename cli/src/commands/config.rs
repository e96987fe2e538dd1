// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hivemind_core::domain::node_config::{NodeConfigManifest, StorageBackendKind};

const MINIMAL_TEMPLATE: &str = include_str!("../../templates/config-minimal.yaml");
const EXAMPLES_TEMPLATE: &str = include_str!("../../templates/config-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./hivemind-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = NodeConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. HIVEMIND_CONFIG_PATH: {}",
            std::env::var("HIVEMIND_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./hivemind-config.yaml");
        println!("  4. ~/.hivemind/config.yaml");
        println!("  5. /etc/hivemind/config.yaml");
        match NodeConfigManifest::discover_config() {
            Some(found) => println!("  Discovered: {}", found.display()),
            None => println!("  Discovered: {}", "(none, using defaults)".dimmed()),
        }
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Node:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(version) = &config.metadata.version {
        println!("  Version: {}", version);
    }
    println!();

    println!("{}", "Coordination:".bold());
    println!(
        "  Execution timeout: {}s",
        config.spec.coordination.execution_timeout_seconds
    );
    println!();

    println!("{}", "Result store:".bold());
    match config.spec.storage.backend {
        StorageBackendKind::Memory => println!("  Backend: memory"),
        StorageBackendKind::Postgres => {
            println!("  Backend: postgres");
            println!(
                "  Database: {}",
                config
                    .spec
                    .storage
                    .database_url
                    .as_deref()
                    .map(redact_url)
                    .unwrap_or_else(|| "(missing)".red().to_string())
            );
            println!("  Max connections: {}", config.spec.storage.max_connections);
        }
    }
    println!();

    println!("{}", "Events:".bold());
    println!("  Channel capacity: {}", config.spec.events.channel_capacity);
    println!();

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = NodeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        EXAMPLES_TEMPLATE
    } else {
        MINIMAL_TEMPLATE
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

/// Hide the password part of a connection string
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:****@{host}")
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid() {
        for template in [MINIMAL_TEMPLATE, EXAMPLES_TEMPLATE] {
            let manifest = NodeConfigManifest::from_yaml_str(template).unwrap();
            manifest.validate().unwrap();
        }
    }

    #[test]
    fn test_generate_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hivemind-config.yaml");
        generate(path.clone(), false).unwrap();

        let manifest = NodeConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(manifest.spec.coordination.execution_timeout_seconds, 300);
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("postgres://hive:secret@db:5432/hive"),
            "postgres://hive:****@db:5432/hive"
        );
        assert_eq!(redact_url("postgres://db/hive"), "postgres://db/hive");
    }
}
