// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workspace file commands
//!
//! Commands: read, write, delete, list, stat, move

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use strongroom_core::domain::actor::ActorId;
use strongroom_core::domain::fsal::{EnforcementError, ListEntry, StorageEnforcementLayer};
use strongroom_core::domain::quota::QuotaWarning;
use strongroom_core::domain::storage::FileType;

use super::{format_bytes, open_store};

#[derive(Subcommand)]
pub enum FileCommand {
    /// Print a file to stdout
    Read {
        /// Acting agent
        #[arg(long, env = "STRONGROOM_ACTOR")]
        actor: String,

        /// Workspace path, e.g. agents/a1/shared/report.md
        #[arg(value_name = "PATH")]
        path: String,

        /// Write the content to a local file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Create or replace a file
    Write {
        #[arg(long, env = "STRONGROOM_ACTOR")]
        actor: String,

        #[arg(value_name = "PATH")]
        path: String,

        /// Local file to upload (default: stdin)
        #[arg(short, long, value_name = "FILE", conflicts_with = "content")]
        input: Option<PathBuf>,

        /// Literal content
        #[arg(long)]
        content: Option<String>,
    },

    /// Delete a file
    Delete {
        #[arg(long, env = "STRONGROOM_ACTOR")]
        actor: String,

        #[arg(value_name = "PATH")]
        path: String,
    },

    /// List a directory
    List {
        #[arg(long, env = "STRONGROOM_ACTOR")]
        actor: String,

        #[arg(value_name = "PATH")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show file or directory metadata
    Stat {
        #[arg(long, env = "STRONGROOM_ACTOR")]
        actor: String,

        #[arg(value_name = "PATH")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a file, possibly across workspaces
    Move {
        #[arg(long, env = "STRONGROOM_ACTOR")]
        actor: String,

        #[arg(value_name = "FROM")]
        from: String,

        #[arg(value_name = "TO")]
        to: String,
    },
}

pub async fn handle_command(command: FileCommand, config_path: Option<PathBuf>) -> Result<()> {
    let store = open_store(config_path)?;
    let layer = store.layer.as_ref();

    match command {
        FileCommand::Read { actor, path, output } => read(layer, actor, path, output).await,
        FileCommand::Write {
            actor,
            path,
            input,
            content,
        } => write(layer, actor, path, input, content).await,
        FileCommand::Delete { actor, path } => delete(layer, actor, path).await,
        FileCommand::List { actor, path, json } => list(layer, actor, path, json).await,
        FileCommand::Stat { actor, path, json } => stat(layer, actor, path, json).await,
        FileCommand::Move { actor, from, to } => move_file(layer, actor, from, to).await,
    }
}

/// Turn a refused operation into a CLI error carrying its audit kind
fn refused(err: EnforcementError) -> anyhow::Error {
    anyhow::anyhow!("{} ({})", err, err.kind())
}

fn print_warning(warning: &QuotaWarning) {
    println!(
        "{}",
        format!(
            "⚠ Workspace above soft quota: {}/{} files ({:.0}%), {}/{} ({:.0}%)",
            warning.file_count,
            warning.max_files,
            warning.file_percent,
            format_bytes(warning.total_bytes),
            format_bytes(warning.max_bytes),
            warning.byte_percent
        )
        .yellow()
    );
}

async fn read(
    layer: &StorageEnforcementLayer,
    actor: String,
    path: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let content = layer
        .read(&ActorId::new(actor), &path)
        .await
        .map_err(refused)?;

    match output {
        Some(file) => {
            tokio::fs::write(&file, &content.data)
                .await
                .with_context(|| format!("Failed to write {:?}", file))?;
            println!(
                "{}",
                format!("✓ {} → {} ({})", path, file.display(), format_bytes(content.attributes.size))
                    .green()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content.data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn write(
    layer: &StorageEnforcementLayer,
    actor: String,
    path: String,
    input: Option<PathBuf>,
    content: Option<String>,
) -> Result<()> {
    let data = match (input, content) {
        (_, Some(content)) => content.into_bytes(),
        (Some(file), None) => tokio::fs::read(&file)
            .await
            .with_context(|| format!("Failed to read {:?}", file))?,
        (None, None) => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    let outcome = layer
        .write(&ActorId::new(actor), &path, &data)
        .await
        .map_err(refused)?;

    let verb = if outcome.created { "Created" } else { "Updated" };
    println!(
        "{}",
        format!("✓ {} {} ({})", verb, outcome.path, format_bytes(outcome.bytes_written)).green()
    );
    if let Some(warning) = &outcome.quota_warning {
        print_warning(warning);
    }
    Ok(())
}

async fn delete(layer: &StorageEnforcementLayer, actor: String, path: String) -> Result<()> {
    let removed = layer
        .delete(&ActorId::new(actor), &path)
        .await
        .map_err(refused)?;

    if removed {
        println!("{}", format!("✓ Deleted {}", path).green());
    } else {
        println!("{}", format!("Nothing to delete at {}", path).yellow());
    }
    Ok(())
}

async fn list(layer: &StorageEnforcementLayer, actor: String, path: String, json: bool) -> Result<()> {
    let entries = layer
        .list(&ActorId::new(actor), &path)
        .await
        .map_err(refused)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "Directory is empty".yellow());
        return Ok(());
    }

    println!("{:<5} {:>10} {:<20} {}", "TYPE", "SIZE", "MODIFIED", "PATH");
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &ListEntry) {
    let (kind, name) = if entry.is_directory {
        ("dir", entry.path.blue().bold())
    } else {
        ("file", entry.path.normal())
    };
    println!(
        "{:<5} {:>10} {:<20} {}",
        kind,
        if entry.is_directory { "-".to_string() } else { format_bytes(entry.size) },
        entry.modified.format("%Y-%m-%d %H:%M:%S"),
        name
    );
}

async fn stat(layer: &StorageEnforcementLayer, actor: String, path: String, json: bool) -> Result<()> {
    let attributes = layer
        .stat(&ActorId::new(actor), &path)
        .await
        .map_err(refused)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&attributes)?);
        return Ok(());
    }

    println!("{}", path.bold());
    let kind = match attributes.file_type {
        FileType::File => "file",
        FileType::Directory => "directory",
    };
    println!("  Type:     {}", kind);
    if attributes.file_type == FileType::File {
        println!("  Size:     {} ({} bytes)", format_bytes(attributes.size), attributes.size);
    }
    println!("  Created:  {}", attributes.created.to_rfc3339());
    println!("  Modified: {}", attributes.modified.to_rfc3339());
    Ok(())
}

async fn move_file(
    layer: &StorageEnforcementLayer,
    actor: String,
    from: String,
    to: String,
) -> Result<()> {
    let outcome = layer
        .move_file(&ActorId::new(actor), &from, &to)
        .await
        .map_err(refused)?;

    println!(
        "{}",
        format!(
            "✓ Moved {} → {} ({})",
            outcome.from,
            outcome.to,
            format_bytes(outcome.bytes_moved)
        )
        .green()
    );
    if let Some(warning) = &outcome.quota_warning {
        print_warning(warning);
    }
    Ok(())
}
