// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Result store inspection
//!
//! Commands: get, list

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hivemind_core::domain::command::CommandRecord;
use hivemind_core::domain::fingerprint::Fingerprint;
use hivemind_core::domain::node_config::{NodeConfigManifest, StorageBackendKind};

use crate::embedded::HiveServices;

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Show the stored output for a fingerprint
    Get {
        #[arg(value_name = "FINGERPRINT")]
        fingerprint: String,
    },

    /// List the most recently stored commands
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

pub async fn handle_command(command: CacheCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = NodeConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    if config.spec.storage.backend == StorageBackendKind::Memory {
        println!(
            "{}",
            "Result store is in-memory; a fresh process starts with an empty cache.".yellow()
        );
    }

    let services = HiveServices::from_config(&config).await?;
    let store = services.result_store();

    match command {
        CacheCommand::Get { fingerprint } => {
            let fingerprint = Fingerprint::from_raw(fingerprint.trim());
            match store.record(&fingerprint).await? {
                Some(record) => print_record(&record, true),
                None => println!("{}", format!("No stored result for {}", fingerprint).yellow()),
            }
        }
        CacheCommand::List { limit } => {
            let records = store.recent(limit).await?;
            if records.is_empty() {
                println!("{}", "No stored results".dimmed());
            }
            for record in &records {
                print_record(record, false);
            }
        }
    }

    Ok(())
}

fn print_record(record: &CommandRecord, full: bool) {
    println!(
        "{}  {}  {}",
        record.fingerprint.short().bold(),
        record.tool_name.cyan(),
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
    );
    if full {
        println!("  Fingerprint: {}", record.fingerprint);
        println!("  Arguments: {}", record.normalized_args);
        println!("  Output:");
        for line in record.output.lines() {
            println!("    {}", line);
        }
    }
}
