// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Audit trail types and the [`AuditLog`] persistence contract.
//!
//! One entry per operation attempt, successful or not. Entries are never
//! mutated or removed by this crate. A move is two entries: `delete` of the
//! source followed by `create` of the destination.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::actor::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    Create,
    Update,
    Delete,
    Read,
}

impl std::fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditOperation::Create => "create",
            AuditOperation::Update => "update",
            AuditOperation::Delete => "delete",
            AuditOperation::Read => "read",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AuditOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(AuditOperation::Create),
            "update" => Ok(AuditOperation::Update),
            "delete" => Ok(AuditOperation::Delete),
            "read" => Ok(AuditOperation::Read),
            other => Err(format!("unknown audit operation: {}", other)),
        }
    }
}

/// Failure classification recorded with unsuccessful attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AuditErrorKind {
    AccessDenied,
    InvalidExtension,
    FileTooLarge,
    QuotaExceeded,
    PathTraversal,
    NotFound,
    InternalError,
}

impl std::fmt::Display for AuditErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One line of the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_id: ActorId,
    pub operation: AuditOperation,
    /// Organization-relative path. Normalized when sanitization succeeded,
    /// otherwise exactly as the caller supplied it.
    pub path: String,
    pub byte_size: Option<u64>,
    pub success: bool,
    pub error_kind: Option<AuditErrorKind>,
}

impl AuditEntry {
    pub fn success(
        actor_id: ActorId,
        operation: AuditOperation,
        path: impl Into<String>,
        byte_size: Option<u64>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_id,
            operation,
            path: path.into(),
            byte_size,
            success: true,
            error_kind: None,
        }
    }

    pub fn failure(
        actor_id: ActorId,
        operation: AuditOperation,
        path: impl Into<String>,
        byte_size: Option<u64>,
        error_kind: AuditErrorKind,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_id,
            operation,
            path: path.into(),
            byte_size,
            success: false,
            error_kind: Some(error_kind),
        }
    }
}

/// Query filters. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub actor_id: Option<ActorId>,
    pub operation: Option<AuditOperation>,
    pub path_prefix: Option<String>,
    /// Inclusive lower bound
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end_time: Option<DateTime<Utc>>,
    /// Keep only the most recent N matches (still returned oldest first)
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(ActorId::new(actor_id));
        self
    }

    pub fn operation(mut self, operation: AuditOperation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(actor) = &self.actor_id {
            if &entry.actor_id != actor {
                return false;
            }
        }
        if let Some(op) = self.operation {
            if entry.operation != op {
                return false;
            }
        }
        if let Some(prefix) = &self.path_prefix {
            if !entry.path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if entry.timestamp > end {
                return false;
            }
        }
        true
    }

    /// Apply `limit` to an oldest-first list of matches
    pub fn truncate(&self, mut entries: Vec<AuditEntry>) -> Vec<AuditEntry> {
        if let Some(limit) = self.limit {
            if entries.len() > limit {
                entries.drain(..entries.len() - limit);
            }
        }
        entries
    }
}

/// Query result with scan diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQueryReport {
    pub entries: Vec<AuditEntry>,
    /// Lines that could not be parsed and were skipped
    pub malformed_lines: usize,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit entry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only audit log
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one entry. Returns once the entry is durable.
    ///
    /// The stored `timestamp` is taken at append time, so stored entries are
    /// ordered by write time whatever the caller put in the draft.
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Matching entries oldest first, with the count of skipped lines
    async fn query_report(&self, filter: &AuditFilter) -> Result<AuditQueryReport, AuditError>;

    /// Matching entries oldest first. Missing storage yields an empty list.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self.query_report(filter).await?.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_entry_serializes_spec_fields() {
        let entry = AuditEntry::failure(
            ActorId::from("a2"),
            AuditOperation::Update,
            "agents/a1/shared/report.md",
            Some(12),
            AuditErrorKind::AccessDenied,
        );
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["actorId", "byteSize", "errorKind", "operation", "path", "success", "timestamp"]
        );
        assert_eq!(obj["operation"], "update");
        assert_eq!(obj["errorKind"], "AccessDenied");
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!("delete".parse::<AuditOperation>().unwrap(), AuditOperation::Delete);
        assert!("move".parse::<AuditOperation>().is_err());
    }

    #[test]
    fn test_filter_matching() {
        let entry = AuditEntry::success(
            ActorId::from("a1"),
            AuditOperation::Create,
            "agents/a1/shared/report.md",
            Some(3),
        );

        assert!(AuditFilter::new().matches(&entry));
        assert!(AuditFilter::new().actor("a1").matches(&entry));
        assert!(!AuditFilter::new().actor("a2").matches(&entry));
        assert!(AuditFilter::new().operation(AuditOperation::Create).matches(&entry));
        assert!(!AuditFilter::new().operation(AuditOperation::Read).matches(&entry));
        assert!(AuditFilter::new().path_prefix("agents/a1/").matches(&entry));
        assert!(!AuditFilter::new().path_prefix("teams/").matches(&entry));

        let before = entry.timestamp - Duration::seconds(5);
        let after = entry.timestamp + Duration::seconds(5);
        assert!(AuditFilter::new().between(Some(before), Some(after)).matches(&entry));
        assert!(!AuditFilter::new().between(Some(after), None).matches(&entry));
        assert!(!AuditFilter::new().between(None, Some(before)).matches(&entry));
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let entries: Vec<AuditEntry> = (0..5)
            .map(|i| {
                AuditEntry::success(
                    ActorId::from("a1"),
                    AuditOperation::Read,
                    format!("agents/a1/private/{}.md", i),
                    None,
                )
            })
            .collect();
        let kept = AuditFilter::new().limit(2).truncate(entries);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].path, "agents/a1/private/3.md");
        assert_eq!(kept[1].path, "agents/a1/private/4.md");
    }
}
