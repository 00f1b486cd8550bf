// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! JSON-lines audit log
//!
//! One file per deployment, one [`AuditEntry`] object per line. Appends are a
//! single `write_all` of a complete line followed by `sync_data`, performed
//! under a process-wide mutex, so concurrent recorders never interleave and a
//! returned `record` call is on disk.
//!
//! Entries are stamped under that mutex, never earlier than the previous
//! line, so timestamps follow file order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::domain::audit::{AuditEntry, AuditError, AuditFilter, AuditLog, AuditQueryReport};

pub struct JsonlAuditLog {
    path: PathBuf,
    writer: Arc<Mutex<Appender>>,
}

#[derive(Default)]
struct Appender {
    /// Lazily opened append handle
    file: Option<File>,
    last_stamp: Option<DateTime<Utc>>,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Arc::new(Mutex::new(Appender::default())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_for_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn append_entry(writer: &Mutex<Appender>, path: &Path, mut entry: AuditEntry) -> Result<(), AuditError> {
    let mut appender = writer.lock();
    if appender.file.is_none() {
        appender.file = Some(open_for_append(path)?);
    }

    let now = Utc::now();
    entry.timestamp = match appender.last_stamp {
        Some(last) if last > now => last,
        _ => now,
    };
    let mut line = serde_json::to_vec(&entry)?;
    line.push(b'\n');

    let Some(file) = appender.file.as_mut() else {
        return Ok(());
    };
    let written = file.write_all(&line).and_then(|_| file.sync_data());
    if let Err(e) = written {
        // Reopen on the next call in case the file was rotated away
        appender.file = None;
        return Err(e.into());
    }
    appender.last_stamp = Some(entry.timestamp);
    Ok(())
}

fn scan(path: &Path, filter: &AuditFilter) -> Result<AuditQueryReport, AuditError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AuditQueryReport::default());
        }
        Err(e) => return Err(e.into()),
    };

    let mut report = AuditQueryReport::default();
    for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        match serde_json::from_slice::<AuditEntry>(&line) {
            Ok(entry) => {
                if filter.matches(&entry) {
                    report.entries.push(entry);
                }
            }
            Err(_) => {
                report.malformed_lines += 1;
                warn!(line = index + 1, "Skipping malformed audit log line");
            }
        }
    }
    report.entries = filter.truncate(report.entries);
    Ok(report)
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let entry = entry.clone();
        let writer = Arc::clone(&self.writer);
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_entry(&writer, &path, entry))
            .await
            .map_err(|e| AuditError::Io(std::io::Error::other(e)))?
    }

    async fn query_report(&self, filter: &AuditFilter) -> Result<AuditQueryReport, AuditError> {
        let path = self.path.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || scan(&path, &filter))
            .await
            .map_err(|e| AuditError::Io(std::io::Error::other(e)))?
    }
}
