// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use strongroom_core::domain::config::{StoreConfigManifest, CONFIG_PATH_ENV};

use super::format_bytes;

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
        /// Output path (default: ./strongroom-config.yaml)
        #[arg(short, long, default_value = "./strongroom-config.yaml")]
        output: PathBuf,

        /// Include a sample directory and quota overrides
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = StoreConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./strongroom-config.yaml");
        println!("  4. ~/.strongroom/config.yaml");
        println!("  5. /etc/strongroom/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Storage:".bold());
    println!("  Root: {}", config.storage_root().display());
    println!("  Audit log: {}", config.audit_log_path().display());
    println!();

    let quotas = &config.spec.quotas;
    println!("{}", "Quotas:".bold());
    println!(
        "  Agent workspaces: {} files / {}",
        quotas.agent.max_files,
        format_bytes(quotas.agent.max_storage_bytes)
    );
    println!(
        "  Team workspaces:  {} files / {}",
        quotas.team.max_files,
        format_bytes(quotas.team.max_storage_bytes)
    );
    for o in &quotas.overrides {
        println!(
            "  {:?} {}: {} files / {}",
            o.owner,
            o.id.bold(),
            o.limits.max_files,
            format_bytes(o.limits.max_storage_bytes)
        );
    }
    println!();

    let directory = &config.spec.directory;
    println!("{}", "Directory:".bold());
    println!("  Actors: {}", directory.actors.len());
    println!("  Teams: {}", directory.teams.len());
    for team in &directory.teams {
        println!(
            "    - {} ({}, {:?}, leader: {})",
            team.id.as_str().bold(),
            team.organization_id,
            team.kind,
            team.leader_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = StoreConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = sample_config(with_examples);

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid() {
        for with_examples in [false, true] {
            let config = StoreConfigManifest::from_yaml_str(sample_config(with_examples)).unwrap();
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_example_template_seeds_directory() {
        let config = StoreConfigManifest::from_yaml_str(sample_config(true)).unwrap();
        assert!(!config.spec.directory.actors.is_empty());
        assert!(!config.spec.quotas.overrides.is_empty());
    }
}
