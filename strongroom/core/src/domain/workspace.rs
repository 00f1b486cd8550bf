// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workspace descriptors and the on-disk layout they are derived from.
//!
//! A workspace is not a stored entity. It is the `(owner, visibility)` pair
//! read off the first three segments of an organization-relative path:
//!
//! ```text
//! <org-root>/agents/<actor-id>/{private,shared}/...
//! <org-root>/teams/<team-id>/{private,shared}/...
//! ```
//!
//! Only the storage enforcement layer turns a path into a descriptor; the
//! access decision engine never sees raw paths.

use crate::domain::actor::{ActorId, OrganizationId, TeamId, TeamKind};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

pub const AGENTS_DIR: &str = "agents";
pub const TEAMS_DIR: &str = "teams";
pub const PRIVATE_DIR: &str = "private";
pub const SHARED_DIR: &str = "shared";

/// Who owns a workspace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum WorkspaceOwner {
    Agent(ActorId),
    Team(TeamId),
    /// Segment that names neither agents nor teams
    Unrecognized(String),
}

impl WorkspaceOwner {
    pub fn id(&self) -> &str {
        match self {
            WorkspaceOwner::Agent(id) => id.as_str(),
            WorkspaceOwner::Team(id) => id.as_str(),
            WorkspaceOwner::Unrecognized(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Shared,
    Unrecognized(String),
}

impl Visibility {
    fn from_segment(segment: &str) -> Self {
        match segment {
            PRIVATE_DIR => Visibility::Private,
            SHARED_DIR => Visibility::Shared,
            other => Visibility::Unrecognized(other.to_string()),
        }
    }

    fn segment(&self) -> &str {
        match self {
            Visibility::Private => PRIVATE_DIR,
            Visibility::Shared => SHARED_DIR,
            Visibility::Unrecognized(raw) => raw,
        }
    }
}

/// Coarse workspace shape. The only detail ever disclosed to a denied caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkspaceClass {
    AgentPrivate,
    AgentShared,
    TeamPrivate,
    TeamShared,
    Unrecognized,
}

impl std::fmt::Display for WorkspaceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkspaceClass::AgentPrivate => "agent-private",
            WorkspaceClass::AgentShared => "agent-shared",
            WorkspaceClass::TeamPrivate => "team-private",
            WorkspaceClass::TeamShared => "team-shared",
            WorkspaceClass::Unrecognized => "unrecognized",
        };
        write!(f, "{}", s)
    }
}

/// Tagged workspace descriptor handed to the access decision engine.
///
/// `organization_id` is the organization of the *owner* as reported by the
/// directory. `None` means the owner could not be resolved, which the engine
/// treats as an unrecognized workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDescriptor {
    pub owner: WorkspaceOwner,
    pub visibility: Visibility,
    pub organization_id: Option<OrganizationId>,
    /// Kind of the owning team, for team workspaces
    pub owner_team_kind: Option<TeamKind>,
}

impl WorkspaceDescriptor {
    pub fn agent(id: impl Into<String>, visibility: Visibility, org: impl Into<String>) -> Self {
        Self {
            owner: WorkspaceOwner::Agent(ActorId::new(id)),
            visibility,
            organization_id: Some(OrganizationId::new(org)),
            owner_team_kind: None,
        }
    }

    pub fn team(
        id: impl Into<String>,
        visibility: Visibility,
        org: impl Into<String>,
        kind: TeamKind,
    ) -> Self {
        Self {
            owner: WorkspaceOwner::Team(TeamId::new(id)),
            visibility,
            organization_id: Some(OrganizationId::new(org)),
            owner_team_kind: Some(kind),
        }
    }

    pub fn class(&self) -> WorkspaceClass {
        match (&self.owner, &self.visibility) {
            (WorkspaceOwner::Agent(_), Visibility::Private) => WorkspaceClass::AgentPrivate,
            (WorkspaceOwner::Agent(_), Visibility::Shared) => WorkspaceClass::AgentShared,
            (WorkspaceOwner::Team(_), Visibility::Private) => WorkspaceClass::TeamPrivate,
            (WorkspaceOwner::Team(_), Visibility::Shared) => WorkspaceClass::TeamShared,
            _ => WorkspaceClass::Unrecognized,
        }
    }

    pub fn is_library(&self) -> bool {
        self.owner_team_kind == Some(TeamKind::Library)
    }
}

/// Position of a sanitized, organization-relative path in the layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLocation {
    pub owner: WorkspaceOwner,
    pub visibility: Visibility,
    /// Path inside the workspace root (empty for the root itself)
    pub inner: PathBuf,
}

impl WorkspaceLocation {
    /// Read the workspace off the leading segments of `relative`.
    ///
    /// Paths too short to name a workspace come back with unrecognized owner
    /// and visibility rather than an error; the engine's default rule denies
    /// them.
    pub fn parse(relative: &Path) -> Self {
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if segments.len() < 3 {
            return Self {
                owner: WorkspaceOwner::Unrecognized(segments.join("/")),
                visibility: Visibility::Unrecognized(String::new()),
                inner: PathBuf::new(),
            };
        }

        let owner = match segments[0].as_str() {
            AGENTS_DIR => WorkspaceOwner::Agent(ActorId::new(segments[1].clone())),
            TEAMS_DIR => WorkspaceOwner::Team(TeamId::new(segments[1].clone())),
            other => WorkspaceOwner::Unrecognized(other.to_string()),
        };

        Self {
            owner,
            visibility: Visibility::from_segment(&segments[2]),
            inner: segments[3..].iter().collect(),
        }
    }

    /// Organization-relative path of the workspace root
    pub fn root(&self) -> PathBuf {
        let kind_dir = match &self.owner {
            WorkspaceOwner::Agent(_) => AGENTS_DIR,
            WorkspaceOwner::Team(_) => TEAMS_DIR,
            WorkspaceOwner::Unrecognized(raw) => raw.as_str(),
        };
        [kind_dir, self.owner.id(), self.visibility.segment()]
            .iter()
            .collect()
    }
}

/// Key of a workspace's quota slot and write lock
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceKey {
    pub organization_id: OrganizationId,
    pub owner: WorkspaceOwner,
    pub visibility: Visibility,
}

impl std::fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.owner {
            WorkspaceOwner::Agent(_) => AGENTS_DIR,
            WorkspaceOwner::Team(_) => TEAMS_DIR,
            WorkspaceOwner::Unrecognized(_) => "?",
        };
        write!(
            f,
            "{}/{}/{}/{}",
            self.organization_id,
            kind,
            self.owner.id(),
            self.visibility.segment()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent_shared() {
        let loc = WorkspaceLocation::parse(Path::new("agents/a1/shared/reports/q1.md"));
        assert_eq!(loc.owner, WorkspaceOwner::Agent(ActorId::from("a1")));
        assert_eq!(loc.visibility, Visibility::Shared);
        assert_eq!(loc.inner, PathBuf::from("reports/q1.md"));
        assert_eq!(loc.root(), PathBuf::from("agents/a1/shared"));
    }

    #[test]
    fn test_parse_team_private_root() {
        let loc = WorkspaceLocation::parse(Path::new("teams/t1/private"));
        assert_eq!(loc.owner, WorkspaceOwner::Team(TeamId::from("t1")));
        assert_eq!(loc.visibility, Visibility::Private);
        assert!(loc.inner.as_os_str().is_empty());
    }

    #[test]
    fn test_parse_unknown_segments() {
        let loc = WorkspaceLocation::parse(Path::new("robots/r1/shared/x.md"));
        assert!(matches!(loc.owner, WorkspaceOwner::Unrecognized(_)));

        let loc = WorkspaceLocation::parse(Path::new("agents/a1/public/x.md"));
        assert_eq!(loc.visibility, Visibility::Unrecognized("public".to_string()));

        let loc = WorkspaceLocation::parse(Path::new("agents/a1"));
        assert!(matches!(loc.owner, WorkspaceOwner::Unrecognized(_)));
    }

    #[test]
    fn test_descriptor_class() {
        let ws = WorkspaceDescriptor::agent("a1", Visibility::Private, "o1");
        assert_eq!(ws.class(), WorkspaceClass::AgentPrivate);

        let ws = WorkspaceDescriptor::team("t1", Visibility::Shared, "o1", TeamKind::Library);
        assert_eq!(ws.class(), WorkspaceClass::TeamShared);
        assert!(ws.is_library());

        let ws = WorkspaceDescriptor {
            owner: WorkspaceOwner::Team(TeamId::from("t1")),
            visibility: Visibility::Unrecognized("misc".to_string()),
            organization_id: None,
            owner_team_kind: None,
        };
        assert_eq!(ws.class(), WorkspaceClass::Unrecognized);
        assert_eq!(ws.class().to_string(), "unrecognized");
    }
}
