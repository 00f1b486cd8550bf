// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-Memory Repository Implementations
//!
//! HashMap-backed stand-ins for the external directory and for the audit
//! file. Used by the CLI (seeded from the config manifest) and by tests.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::actor::{Actor, ActorId, Team, TeamId};
use crate::domain::audit::{AuditEntry, AuditError, AuditFilter, AuditLog, AuditQueryReport};
use crate::domain::repository::{ActorDirectory, RepositoryError};

#[derive(Clone, Default)]
pub struct InMemoryActorDirectory {
    actors: Arc<RwLock<HashMap<ActorId, Actor>>>,
    teams: Arc<RwLock<HashMap<TeamId, Team>>>,
}

impl InMemoryActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from seed records, rejecting conflicting teams
    pub fn seeded(actors: &[Actor], teams: &[Team]) -> Result<Self, RepositoryError> {
        let directory = Self::new();
        for team in teams {
            directory.save_team(team.clone())?;
        }
        for actor in actors {
            directory.save_actor(actor.clone());
        }
        Ok(directory)
    }

    /// Save actor (create or update)
    pub fn save_actor(&self, actor: Actor) {
        self.actors.write().insert(actor.id.clone(), actor);
    }

    /// Save team (create or update).
    ///
    /// An organization holds at most one library and one leadership team.
    pub fn save_team(&self, team: Team) -> Result<(), RepositoryError> {
        let mut teams = self.teams.write();
        if team.kind.is_special() {
            let holder = teams.values().find(|t| {
                t.id != team.id && t.organization_id == team.organization_id && t.kind == team.kind
            });
            if let Some(existing) = holder {
                return Err(RepositoryError::Conflict(format!(
                    "organization {} already has {:?} team {}",
                    team.organization_id, team.kind, existing.id
                )));
            }
        }
        teams.insert(team.id.clone(), team);
        Ok(())
    }

    pub fn remove_actor(&self, id: &ActorId) -> Result<(), RepositoryError> {
        self.actors
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    pub fn remove_team(&self, id: &TeamId) -> Result<(), RepositoryError> {
        self.teams
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl ActorDirectory for InMemoryActorDirectory {
    async fn find_actor(&self, id: &ActorId) -> Result<Option<Actor>, RepositoryError> {
        Ok(self.actors.read().get(id).cloned())
    }

    async fn find_team(&self, id: &TeamId) -> Result<Option<Team>, RepositoryError> {
        Ok(self.teams.read().get(id).cloned())
    }
}

/// Audit log kept in a Vec; records are never removed
#[derive(Clone, Default)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut entries = self.entries.write();
        let mut entry = entry.clone();
        let now = chrono::Utc::now();
        entry.timestamp = match entries.last() {
            Some(prev) if prev.timestamp > now => prev.timestamp,
            _ => now,
        };
        entries.push(entry);
        Ok(())
    }

    async fn query_report(&self, filter: &AuditFilter) -> Result<AuditQueryReport, AuditError> {
        let matches: Vec<AuditEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        Ok(AuditQueryReport {
            entries: filter.truncate(matches),
            malformed_lines: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::TeamKind;
    use crate::domain::audit::AuditOperation;

    #[tokio::test]
    async fn test_directory_lookup() {
        let directory = InMemoryActorDirectory::seeded(
            &[Actor::new("a1", "o1").in_team("t1")],
            &[Team::new("t1", "o1", TeamKind::Ordinary).led_by("a1")],
        )
        .unwrap();

        let actor = directory.find_actor(&ActorId::from("a1")).await.unwrap().unwrap();
        assert_eq!(actor.team_id, Some(TeamId::from("t1")));
        assert!(directory.find_actor(&ActorId::from("zz")).await.unwrap().is_none());

        directory.remove_actor(&ActorId::from("a1")).unwrap();
        assert!(directory.find_actor(&ActorId::from("a1")).await.unwrap().is_none());
        assert!(matches!(
            directory.remove_actor(&ActorId::from("a1")),
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_one_special_team_per_kind_and_org() {
        let directory = InMemoryActorDirectory::new();
        directory.save_team(Team::new("lib", "o1", TeamKind::Library)).unwrap();
        directory.save_team(Team::new("exec", "o1", TeamKind::Leadership)).unwrap();

        assert!(matches!(
            directory.save_team(Team::new("lib2", "o1", TeamKind::Library)),
            Err(RepositoryError::Conflict(_))
        ));
        // Re-saving the same team and other organizations are fine
        directory.save_team(Team::new("lib", "o1", TeamKind::Library).led_by("a1")).unwrap();
        directory.save_team(Team::new("lib-o2", "o2", TeamKind::Library)).unwrap();
        directory.save_team(Team::new("t3", "o1", TeamKind::Ordinary)).unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_audit_log() {
        let log = InMemoryAuditLog::new();
        assert!(log.is_empty());
        log.record(&AuditEntry::success(ActorId::from("a1"), AuditOperation::Read, "x.md", None))
            .await
            .unwrap();
        assert_eq!(log.len(), 1);
        let found = log.query(&AuditFilter::new().actor("a1")).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
