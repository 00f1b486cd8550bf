// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Requester identities as supplied by the external directory provider.
//!
//! Actors and teams are owned by the directory; this crate only reads them.
//! Identifiers double as path segments in the on-disk layout, so they are
//! plain strings rather than UUIDs.

use serde::{Deserialize, Serialize};

/// Identifier of an individual agent
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a team
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TeamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of an organization (one storage root per organization)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrganizationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An agent requesting a file operation.
///
/// Immutable for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub is_team_leader: bool,
}

impl Actor {
    pub fn new(id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(id),
            organization_id: OrganizationId::new(organization_id),
            team_id: None,
            is_team_leader: false,
        }
    }

    pub fn in_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(TeamId::new(team_id));
        self
    }

    pub fn as_leader(mut self) -> Self {
        self.is_team_leader = true;
        self
    }

    /// True if the actor is a member of `team_id`
    pub fn belongs_to(&self, team_id: &TeamId) -> bool {
        self.team_id.as_ref() == Some(team_id)
    }
}

/// Role a team plays within its organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeamKind {
    #[default]
    Ordinary,
    /// Shared workspace is the organization's knowledge base
    Library,
    /// Members may read every shared workspace in the organization
    Leadership,
}

impl TeamKind {
    /// Library and leadership are unique per organization
    pub fn is_special(&self) -> bool {
        !matches!(self, TeamKind::Ordinary)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub organization_id: OrganizationId,
    pub leader_id: Option<ActorId>,
    #[serde(default)]
    pub kind: TeamKind,
}

impl Team {
    pub fn new(id: impl Into<String>, organization_id: impl Into<String>, kind: TeamKind) -> Self {
        Self {
            id: TeamId::new(id),
            organization_id: OrganizationId::new(organization_id),
            leader_id: None,
            kind,
        }
    }

    pub fn led_by(mut self, leader_id: impl Into<String>) -> Self {
        self.leader_id = Some(ActorId::new(leader_id));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_builder() {
        let actor = Actor::new("a1", "o1").in_team("t1").as_leader();
        assert!(actor.belongs_to(&TeamId::from("t1")));
        assert!(!actor.belongs_to(&TeamId::from("t2")));
        assert!(actor.is_team_leader);
    }

    #[test]
    fn test_actor_yaml_uses_camel_case() {
        let yaml = "id: a1\norganizationId: o1\nteamId: t1\nisTeamLeader: true\n";
        let actor: Actor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(actor, Actor::new("a1", "o1").in_team("t1").as_leader());
    }

    #[test]
    fn test_team_kind_defaults_to_ordinary() {
        let team: Team = serde_yaml::from_str("id: t1\norganizationId: o1\nleaderId: a1\n").unwrap();
        assert_eq!(team.kind, TeamKind::Ordinary);
        assert!(!team.kind.is_special());
        assert!(TeamKind::Library.is_special());
    }
}
