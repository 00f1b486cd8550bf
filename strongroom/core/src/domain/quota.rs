// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Quota Tracker
//!
//! Per-workspace file and byte counters, held in memory and rebuilt from a
//! directory scan on first use. Each workspace has one async mutex guarding
//! its counter; the same guard serializes writers to that workspace, so two
//! writers can never both observe a stale count and jointly pass the hard
//! ceiling.
//!
//! Ceilings:
//! - soft: projected usage reaches 100% of the limit. The write proceeds and
//!   the caller receives a [`QuotaWarning`].
//! - hard: projected usage goes above 110% of the limit. The write is rejected.

use crate::domain::storage::UsageScan;
use crate::domain::workspace::{WorkspaceKey, WorkspaceOwner};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const SOFT_CEILING_PERCENT: u64 = 100;
pub const HARD_CEILING_PERCENT: u64 = 110;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Configured ceilings for one workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaLimits {
    pub max_files: u64,
    pub max_storage_bytes: u64,
}

impl QuotaLimits {
    pub fn new(max_files: u64, max_storage_bytes: u64) -> Self {
        Self { max_files, max_storage_bytes }
    }

    /// 1000 files / 100 MiB
    pub fn agent_default() -> Self {
        Self::new(1000, 100 * MIB)
    }

    /// 2000 files / 1 GiB
    pub fn team_default() -> Self {
        Self::new(2000, GIB)
    }
}

/// Current counters of one workspace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub file_count: u64,
    pub total_bytes: u64,
}

impl QuotaState {
    /// Counters after replacing a file of `previous_size` (None if new) with
    /// one of `new_size` bytes. Updates change bytes only.
    pub fn after_write(&self, previous_size: Option<u64>, new_size: u64) -> Self {
        match previous_size {
            Some(old) => Self {
                file_count: self.file_count,
                total_bytes: self.total_bytes.saturating_sub(old).saturating_add(new_size),
            },
            None => Self {
                file_count: self.file_count.saturating_add(1),
                total_bytes: self.total_bytes.saturating_add(new_size),
            },
        }
    }

    pub fn after_delete(&self, size: u64) -> Self {
        Self {
            file_count: self.file_count.saturating_sub(1),
            total_bytes: self.total_bytes.saturating_sub(size),
        }
    }
}

impl From<UsageScan> for QuotaState {
    fn from(scan: UsageScan) -> Self {
        Self {
            file_count: scan.file_count,
            total_bytes: scan.total_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaStatus {
    Ok,
    Warning,
    Exceeded,
}

impl QuotaStatus {
    fn of(value: u64, limit: u64) -> Self {
        let value = value as u128 * 100;
        let limit = limit as u128;
        if value > limit * HARD_CEILING_PERCENT as u128 {
            QuotaStatus::Exceeded
        } else if value >= limit * SOFT_CEILING_PERCENT as u128 {
            QuotaStatus::Warning
        } else {
            QuotaStatus::Ok
        }
    }

    fn worst(self, other: Self) -> Self {
        match (self, other) {
            (QuotaStatus::Exceeded, _) | (_, QuotaStatus::Exceeded) => QuotaStatus::Exceeded,
            (QuotaStatus::Warning, _) | (_, QuotaStatus::Warning) => QuotaStatus::Warning,
            _ => QuotaStatus::Ok,
        }
    }
}

/// Usage snapshot with limits, as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaUsage {
    pub file_count: u64,
    pub total_bytes: u64,
    pub max_files: u64,
    pub max_bytes: u64,
    pub file_percent: f64,
    pub byte_percent: f64,
    pub status: QuotaStatus,
}

impl QuotaUsage {
    pub fn of(state: QuotaState, limits: QuotaLimits) -> Self {
        let percent = |value: u64, limit: u64| {
            if limit == 0 {
                100.0
            } else {
                value as f64 * 100.0 / limit as f64
            }
        };
        Self {
            file_count: state.file_count,
            total_bytes: state.total_bytes,
            max_files: limits.max_files,
            max_bytes: limits.max_storage_bytes,
            file_percent: percent(state.file_count, limits.max_files),
            byte_percent: percent(state.total_bytes, limits.max_storage_bytes),
            status: QuotaStatus::of(state.file_count, limits.max_files)
                .worst(QuotaStatus::of(state.total_bytes, limits.max_storage_bytes)),
        }
    }
}

/// Soft-ceiling signal returned alongside a successful write
pub type QuotaWarning = QuotaUsage;

/// Outcome of checking a projected write against a workspace's limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuotaCheck {
    WithinLimit,
    SoftLimit(QuotaWarning),
    HardLimit(QuotaUsage),
}

/// Limits applied per workspace: defaults per owner kind, overridable per owner
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaPolicy {
    pub agent: QuotaLimits,
    pub team: QuotaLimits,
    pub overrides: HashMap<WorkspaceOwner, QuotaLimits>,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            agent: QuotaLimits::agent_default(),
            team: QuotaLimits::team_default(),
            overrides: HashMap::new(),
        }
    }
}

impl QuotaPolicy {
    pub fn with_override(mut self, owner: WorkspaceOwner, limits: QuotaLimits) -> Self {
        self.overrides.insert(owner, limits);
        self
    }

    pub fn limits_for(&self, owner: &WorkspaceOwner) -> QuotaLimits {
        if let Some(limits) = self.overrides.get(owner) {
            return *limits;
        }
        match owner {
            WorkspaceOwner::Team(_) => self.team,
            _ => self.agent,
        }
    }
}

/// Shared registry of per-workspace counters and write locks
pub struct QuotaTracker {
    policy: QuotaPolicy,
    slots: DashMap<WorkspaceKey, Arc<Mutex<Option<QuotaState>>>>,
}

impl QuotaTracker {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            policy,
            slots: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Acquire the workspace's lock. Held for the whole
    /// validate, write, count, audit sequence of a mutating operation.
    pub async fn lock(&self, key: &WorkspaceKey) -> WorkspaceGuard {
        let slot = {
            let entry = self
                .slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)));
            Arc::clone(entry.value())
        };
        WorkspaceGuard {
            key: key.clone(),
            limits: self.policy.limits_for(&key.owner),
            state: slot.lock_owned().await,
        }
    }

    /// Acquire two workspace locks in a stable order.
    ///
    /// Returns `None` for the second guard when both keys name the same
    /// workspace.
    pub async fn lock_pair(
        &self,
        first: &WorkspaceKey,
        second: &WorkspaceKey,
    ) -> (WorkspaceGuard, Option<WorkspaceGuard>) {
        if first == second {
            return (self.lock(first).await, None);
        }
        if first.to_string() <= second.to_string() {
            let a = self.lock(first).await;
            let b = self.lock(second).await;
            (a, Some(b))
        } else {
            let b = self.lock(second).await;
            let a = self.lock(first).await;
            (a, Some(b))
        }
    }
}

/// Exclusive handle on one workspace's counters
pub struct WorkspaceGuard {
    key: WorkspaceKey,
    limits: QuotaLimits,
    state: OwnedMutexGuard<Option<QuotaState>>,
}

impl WorkspaceGuard {
    pub fn key(&self) -> &WorkspaceKey {
        &self.key
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// False until a scan has been loaded (lazy initialisation)
    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// Replace the counters with a fresh directory scan
    pub fn load(&mut self, scan: UsageScan) {
        *self.state = Some(scan.into());
    }

    /// Drop the counters; the next operation rescans
    pub fn invalidate(&mut self) {
        *self.state = None;
    }

    pub fn state(&self) -> QuotaState {
        self.state.unwrap_or_default()
    }

    pub fn usage(&self) -> QuotaUsage {
        QuotaUsage::of(self.state(), self.limits)
    }

    pub fn check_write(&self, previous_size: Option<u64>, new_size: u64) -> QuotaCheck {
        let projected = QuotaUsage::of(self.state().after_write(previous_size, new_size), self.limits);
        match projected.status {
            QuotaStatus::Ok => QuotaCheck::WithinLimit,
            QuotaStatus::Warning => QuotaCheck::SoftLimit(projected),
            QuotaStatus::Exceeded => QuotaCheck::HardLimit(projected),
        }
    }

    pub fn record_write(&mut self, previous_size: Option<u64>, new_size: u64) {
        let next = self.state().after_write(previous_size, new_size);
        *self.state = Some(next);
    }

    pub fn record_delete(&mut self, size: u64) {
        let next = self.state().after_delete(size);
        *self.state = Some(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::{ActorId, OrganizationId, TeamId};
    use crate::domain::workspace::Visibility;

    fn agent_key(id: &str) -> WorkspaceKey {
        WorkspaceKey {
            organization_id: OrganizationId::from("o1"),
            owner: WorkspaceOwner::Agent(ActorId::from(id)),
            visibility: Visibility::Private,
        }
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(QuotaStatus::of(9, 10), QuotaStatus::Ok);
        assert_eq!(QuotaStatus::of(10, 10), QuotaStatus::Warning);
        assert_eq!(QuotaStatus::of(11, 10), QuotaStatus::Warning);
        assert_eq!(QuotaStatus::of(12, 10), QuotaStatus::Exceeded);
        assert_eq!(QuotaStatus::of(u64::MAX, u64::MAX), QuotaStatus::Warning);
    }

    #[test]
    fn test_update_changes_bytes_only() {
        let state = QuotaState { file_count: 3, total_bytes: 300 };
        let updated = state.after_write(Some(100), 100);
        assert_eq!(updated, state);

        let grown = state.after_write(Some(100), 150);
        assert_eq!(grown, QuotaState { file_count: 3, total_bytes: 350 });

        let created = state.after_write(None, 50);
        assert_eq!(created, QuotaState { file_count: 4, total_bytes: 350 });

        let deleted = created.after_delete(50);
        assert_eq!(deleted, state);
    }

    #[test]
    fn test_policy_overrides() {
        let policy = QuotaPolicy::default()
            .with_override(WorkspaceOwner::Agent(ActorId::from("a1")), QuotaLimits::new(10, 1024));

        assert_eq!(
            policy.limits_for(&WorkspaceOwner::Agent(ActorId::from("a1"))),
            QuotaLimits::new(10, 1024)
        );
        assert_eq!(
            policy.limits_for(&WorkspaceOwner::Agent(ActorId::from("a2"))),
            QuotaLimits::agent_default()
        );
        assert_eq!(
            policy.limits_for(&WorkspaceOwner::Team(TeamId::from("a1"))),
            QuotaLimits::team_default()
        );
    }

    #[tokio::test]
    async fn test_guard_checks_and_records() {
        let policy = QuotaPolicy::default()
            .with_override(WorkspaceOwner::Agent(ActorId::from("a1")), QuotaLimits::new(10, 1 << 20));
        let tracker = QuotaTracker::new(policy);
        let key = agent_key("a1");

        {
            let mut guard = tracker.lock(&key).await;
            assert!(!guard.is_loaded());
            guard.load(UsageScan { file_count: 9, total_bytes: 90 });
            assert_eq!(guard.check_write(None, 10), QuotaCheck::SoftLimit(guard.usage_after(None, 10)));
            guard.record_write(None, 10);
            guard.record_write(None, 10);
            assert!(matches!(guard.check_write(None, 10), QuotaCheck::HardLimit(_)));
            assert!(matches!(guard.check_write(Some(10), 10), QuotaCheck::SoftLimit(_)));
        }

        let guard = tracker.lock(&key).await;
        assert!(guard.is_loaded());
        assert_eq!(guard.state(), QuotaState { file_count: 11, total_bytes: 110 });
    }

    #[tokio::test]
    async fn test_lock_pair_same_workspace() {
        let tracker = QuotaTracker::new(QuotaPolicy::default());
        let key = agent_key("a1");
        let (_first, second) = tracker.lock_pair(&key, &key).await;
        assert!(second.is_none());
    }

    impl WorkspaceGuard {
        fn usage_after(&self, previous: Option<u64>, size: u64) -> QuotaUsage {
            QuotaUsage::of(self.state().after_write(previous, size), self.limits)
        }
    }
}
