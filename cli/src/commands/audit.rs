// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Audit trail commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use strongroom_core::domain::audit::{AuditEntry, AuditFilter, AuditOperation};

use super::open_store;

#[derive(Subcommand)]
pub enum AuditCommand {
    /// Query audit entries, oldest first
    Query {
        /// Only entries by this actor
        #[arg(long)]
        actor: Option<String>,

        /// Only this operation (create, update, delete, read)
        #[arg(long)]
        operation: Option<AuditOperation>,

        /// Only paths starting with this prefix
        #[arg(long, value_name = "PREFIX")]
        path_prefix: Option<String>,

        /// Earliest timestamp, inclusive (RFC 3339)
        #[arg(long, value_name = "TIME")]
        since: Option<DateTime<Utc>>,

        /// Latest timestamp, inclusive (RFC 3339)
        #[arg(long, value_name = "TIME")]
        until: Option<DateTime<Utc>>,

        /// Keep only the most recent N matches
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output raw JSON lines
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: AuditCommand, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        AuditCommand::Query {
            actor,
            operation,
            path_prefix,
            since,
            until,
            limit,
            json,
        } => {
            let filter = build_filter(actor, operation, path_prefix, since, until, limit);
            query(config_path, filter, json).await
        }
    }
}

fn build_filter(
    actor: Option<String>,
    operation: Option<AuditOperation>,
    path_prefix: Option<String>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    limit: Option<usize>,
) -> AuditFilter {
    let mut filter = AuditFilter::new().between(since, until);
    if let Some(actor) = actor {
        filter = filter.actor(actor);
    }
    if let Some(operation) = operation {
        filter = filter.operation(operation);
    }
    if let Some(prefix) = path_prefix {
        filter = filter.path_prefix(prefix);
    }
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }
    filter
}

async fn query(config_path: Option<PathBuf>, filter: AuditFilter, json: bool) -> Result<()> {
    let store = open_store(config_path)?;
    let report = store
        .audit
        .query_report(&filter)
        .await
        .context("Failed to read audit log")?;

    if report.malformed_lines > 0 {
        eprintln!(
            "{}",
            format!("⚠ Skipped {} malformed audit line(s)", report.malformed_lines).yellow()
        );
    }

    if json {
        for entry in &report.entries {
            println!("{}", serde_json::to_string(entry)?);
        }
        return Ok(());
    }

    if report.entries.is_empty() {
        println!("{}", "No audit entries match".yellow());
        return Ok(());
    }

    println!(
        "{:<25} {:<12} {:<7} {:<18} {}",
        "TIMESTAMP", "ACTOR", "OP", "RESULT", "PATH"
    );
    for entry in &report.entries {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &AuditEntry) {
    let result = match entry.error_kind {
        None => "ok".green(),
        Some(kind) => kind.to_string().red(),
    };
    println!(
        "{:<25} {:<12} {:<7} {:<18} {}",
        entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        entry.actor_id,
        entry.operation,
        result,
        entry.path
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        let filter = build_filter(
            Some("a1".to_string()),
            Some(AuditOperation::Create),
            Some("agents/a1".to_string()),
            None,
            None,
            Some(5),
        );
        assert_eq!(filter.actor_id.as_ref().map(|a| a.as_str()), Some("a1"));
        assert_eq!(filter.operation, Some(AuditOperation::Create));
        assert_eq!(filter.path_prefix.as_deref(), Some("agents/a1"));
        assert_eq!(filter.limit, Some(5));
        assert!(filter.start_time.is_none());
    }
}
