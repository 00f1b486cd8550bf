// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Strongroom CLI
//!
//! The `strongroom` binary drives a local workspace store: every file
//! command runs through the storage enforcement layer on behalf of an actor
//! named with `--actor`, and is recorded in the audit log.
//!
//! ## Commands
//!
//! - `strongroom file read|write|delete|list|stat|move` - Workspace file operations
//! - `strongroom audit query` - Filter the audit trail
//! - `strongroom quota show|rebuild` - Workspace usage counters
//! - `strongroom config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use strongroom_cli::commands::{self, AuditCommand, ConfigCommand, FileCommand, QuotaCommand};

/// Strongroom - scoped file access for agents and teams
#[derive(Parser)]
#[command(name = "strongroom")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "STRONGROOM_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "STRONGROOM_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Workspace file operations
    #[command(name = "file")]
    File {
        #[command(subcommand)]
        command: FileCommand,
    },

    /// Audit trail queries
    #[command(name = "audit")]
    Audit {
        #[command(subcommand)]
        command: AuditCommand,
    },

    /// Workspace quota usage
    #[command(name = "quota")]
    Quota {
        #[command(subcommand)]
        command: QuotaCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;
    strongroom_core::metrics::describe();

    match cli.command {
        Some(Commands::File { command }) => commands::file::handle_command(command, cli.config).await,
        Some(Commands::Audit { command }) => {
            commands::audit::handle_command(command, cli.config).await
        }
        Some(Commands::Quota { command }) => {
            commands::quota::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
