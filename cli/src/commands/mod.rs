// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the strongroom CLI

pub mod audit;
pub mod config;
pub mod file;
pub mod quota;

pub use self::audit::AuditCommand;
pub use self::config::ConfigCommand;
pub use self::file::FileCommand;
pub use self::quota::QuotaCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;

use strongroom_core::application::store_factory::{build_store, Store};
use strongroom_core::domain::config::StoreConfigManifest;

/// Load configuration (explicit path, discovery or defaults) and open the store
pub(crate) fn open_store(config_path: Option<PathBuf>) -> Result<Store> {
    let config =
        StoreConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    build_store(&config)
}

/// Human-readable byte count
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
