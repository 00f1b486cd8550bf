// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Quota commands
//!
//! `show` runs as an actor and needs read access to the workspace.
//! `rebuild` is an operator command: it drops the cached counters and
//! rescans the workspace directory.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use strongroom_core::domain::actor::{ActorId, OrganizationId};
use strongroom_core::domain::quota::{QuotaStatus, QuotaUsage};

use super::{format_bytes, open_store};

#[derive(Subcommand)]
pub enum QuotaCommand {
    /// Show usage of the workspace containing PATH
    Show {
        #[arg(long, env = "STRONGROOM_ACTOR")]
        actor: String,

        #[arg(value_name = "PATH")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rescan a workspace and reset its counters
    Rebuild {
        /// Organization owning the workspace
        #[arg(long)]
        org: String,

        /// Workspace path, e.g. teams/t1/shared
        #[arg(value_name = "PATH")]
        path: String,
    },
}

pub async fn handle_command(command: QuotaCommand, config_path: Option<PathBuf>) -> Result<()> {
    let store = open_store(config_path)?;

    match command {
        QuotaCommand::Show { actor, path, json } => {
            let usage = store
                .layer
                .quota_usage(&ActorId::new(actor), &path)
                .await
                .map_err(|e| anyhow::anyhow!("{} ({})", e, e.kind()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&usage)?);
            } else {
                print_usage(&path, &usage);
            }
            Ok(())
        }
        QuotaCommand::Rebuild { org, path } => {
            let usage = store
                .layer
                .rebuild_quota(&OrganizationId::new(org), &path)
                .await?;
            println!("{}", "✓ Quota counters rebuilt".green());
            print_usage(&path, &usage);
            Ok(())
        }
    }
}

fn print_usage(path: &str, usage: &QuotaUsage) {
    let status = match usage.status {
        QuotaStatus::Ok => "ok".green(),
        QuotaStatus::Warning => "warning".yellow(),
        QuotaStatus::Exceeded => "exceeded".red(),
    };
    println!("{}", path.bold());
    println!(
        "  Files:  {}/{} ({:.1}%)",
        usage.file_count, usage.max_files, usage.file_percent
    );
    println!(
        "  Bytes:  {}/{} ({:.1}%)",
        format_bytes(usage.total_bytes),
        format_bytes(usage.max_bytes),
        usage.byte_percent
    );
    println!("  Status: {}", status);
}
