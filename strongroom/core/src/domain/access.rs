// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Access Decision Engine
//!
//! Pure function of `(requester, workspace descriptor, operation)` to
//! allow/deny. No I/O, no path parsing, no panics on well-formed input.
//!
//! ## Rule Order
//!
//! [`AccessDecisionEngine::decide`] evaluates these rules in a fixed order;
//! the first rule whose workspace shape matches decides:
//!
//! 1. **Agent-private**: only the owning agent. No exception for leaders.
//! 2. **Agent-shared**: write/delete by the owner; read by anyone in the
//!    owner's organization.
//! 3. **Team-private**: members only; write/delete by the team leader.
//! 4. **Team-shared**: write/delete by team members; read by anyone in the
//!    owner's organization.
//! 5. **Library-team-shared**: rule 4 unchanged. Its organization-wide read
//!    visibility is the knowledge base; there is no separate branch for it.
//! 6. **Leadership override**: members of the organization's leadership team
//!    may read any shared workspace in their organization. This is the
//!    organization-wide shared read of rules 2 and 4 seen from the leadership
//!    side, so it needs no branch of its own and grants nothing beyond it.
//!    Never applies to private workspaces.
//! 7. **Default**: deny, "workspace not recognized". Descriptors whose owner
//!    could not be resolved or whose owner/visibility segment is unknown land
//!    here.
//!
//! Seniority confers nothing: a team leader has no access to a member's
//! private agent workspace.

use crate::domain::actor::{Actor, OrganizationId, TeamKind};
use crate::domain::workspace::{Visibility, WorkspaceDescriptor, WorkspaceOwner};
use serde::{Deserialize, Serialize};

/// Operation class as seen by the engine. `list` and `stat` are reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessOperation {
    Read,
    Write,
    Delete,
}

impl AccessOperation {
    pub const ALL: [AccessOperation; 3] = [Self::Read, Self::Write, Self::Delete];

    pub fn is_mutation(&self) -> bool {
        !matches!(self, AccessOperation::Read)
    }
}

/// Verified requester, as resolved from the directory by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub actor: Actor,
    /// Kind of the actor's own team, if any
    pub team_kind: Option<TeamKind>,
}

impl Requester {
    pub fn new(actor: Actor, team_kind: Option<TeamKind>) -> Self {
        Self { actor, team_kind }
    }

    fn in_organization(&self, org: &OrganizationId) -> bool {
        &self.actor.organization_id == org
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotOwner,
    NotTeamMember,
    NotTeamLeader,
    OutsideOrganization,
    WorkspaceNotRecognized,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DenyReason::NotOwner => "requester does not own this workspace",
            DenyReason::NotTeamMember => "requester is not a member of the owning team",
            DenyReason::NotTeamLeader => "only the team leader may modify this workspace",
            DenyReason::OutsideOrganization => "workspace belongs to another organization",
            DenyReason::WorkspaceNotRecognized => "workspace not recognized",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    fn from_check(allowed: bool, reason: DenyReason) -> Self {
        if allowed {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(reason)
        }
    }
}

/// Stateless rule evaluator. The rule order is fixed and not configurable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessDecisionEngine;

impl AccessDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(
        &self,
        requester: &Requester,
        workspace: &WorkspaceDescriptor,
        operation: AccessOperation,
    ) -> AccessDecision {
        let actor = &requester.actor;

        // An owner the directory cannot place is not a workspace we know.
        let Some(owner_org) = workspace.organization_id.as_ref() else {
            return AccessDecision::Deny(DenyReason::WorkspaceNotRecognized);
        };

        match (&workspace.owner, &workspace.visibility) {
            // Rule 1
            (WorkspaceOwner::Agent(owner), Visibility::Private) => {
                AccessDecision::from_check(&actor.id == owner, DenyReason::NotOwner)
            }
            // Rule 2
            (WorkspaceOwner::Agent(owner), Visibility::Shared) => {
                if operation.is_mutation() {
                    AccessDecision::from_check(&actor.id == owner, DenyReason::NotOwner)
                } else {
                    self.shared_read(requester, owner_org)
                }
            }
            // Rule 3
            (WorkspaceOwner::Team(team), Visibility::Private) => {
                if !actor.belongs_to(team) {
                    AccessDecision::Deny(DenyReason::NotTeamMember)
                } else if operation.is_mutation() {
                    AccessDecision::from_check(actor.is_team_leader, DenyReason::NotTeamLeader)
                } else {
                    AccessDecision::Allow
                }
            }
            // Rules 4 and 5
            (WorkspaceOwner::Team(team), Visibility::Shared) => {
                if operation.is_mutation() {
                    AccessDecision::from_check(actor.belongs_to(team), DenyReason::NotTeamMember)
                } else {
                    self.shared_read(requester, owner_org)
                }
            }
            // Rule 7
            _ => AccessDecision::Deny(DenyReason::WorkspaceNotRecognized),
        }
    }

    /// Read visibility of a shared workspace: organization-wide (rules 2, 4
    /// and 5). The leadership override (rule 6) is this same check.
    fn shared_read(&self, requester: &Requester, owner_org: &OrganizationId) -> AccessDecision {
        AccessDecision::from_check(
            requester.in_organization(owner_org),
            DenyReason::OutsideOrganization,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::TeamId;

    fn requester(actor: Actor) -> Requester {
        Requester::new(actor, Some(TeamKind::Ordinary))
    }

    fn engine() -> AccessDecisionEngine {
        AccessDecisionEngine::new()
    }

    #[test]
    fn test_agent_private_owner_only() {
        let ws = WorkspaceDescriptor::agent("a1", Visibility::Private, "o1");
        let owner = requester(Actor::new("a1", "o1").in_team("t1"));
        let teammate = requester(Actor::new("a2", "o1").in_team("t1"));
        let leader = requester(Actor::new("lead", "o1").in_team("t1").as_leader());
        let chief = Requester::new(Actor::new("ceo", "o1").in_team("exec"), Some(TeamKind::Leadership));

        for op in AccessOperation::ALL {
            assert!(engine().decide(&owner, &ws, op).is_allowed());
            for other in [&teammate, &leader, &chief] {
                assert_eq!(
                    engine().decide(other, &ws, op),
                    AccessDecision::Deny(DenyReason::NotOwner),
                    "{:?} on {:?}",
                    other.actor.id,
                    op
                );
            }
        }
    }

    #[test]
    fn test_agent_shared_org_read_owner_write() {
        let ws = WorkspaceDescriptor::agent("a1", Visibility::Shared, "o1");
        let colleague = requester(Actor::new("a2", "o1").in_team("t2"));
        let outsider = requester(Actor::new("x1", "o2").in_team("t9"));

        assert!(engine().decide(&colleague, &ws, AccessOperation::Read).is_allowed());
        assert_eq!(
            engine().decide(&colleague, &ws, AccessOperation::Write),
            AccessDecision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(
            engine().decide(&colleague, &ws, AccessOperation::Delete),
            AccessDecision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(
            engine().decide(&outsider, &ws, AccessOperation::Read),
            AccessDecision::Deny(DenyReason::OutsideOrganization)
        );
    }

    #[test]
    fn test_team_private_members_read_leader_writes() {
        let ws = WorkspaceDescriptor::team("t1", Visibility::Private, "o1", TeamKind::Ordinary);
        let member = requester(Actor::new("a1", "o1").in_team("t1"));
        let leader = requester(Actor::new("a0", "o1").in_team("t1").as_leader());
        let other_leader = requester(Actor::new("b0", "o1").in_team("t2").as_leader());

        assert!(engine().decide(&member, &ws, AccessOperation::Read).is_allowed());
        assert_eq!(
            engine().decide(&member, &ws, AccessOperation::Write),
            AccessDecision::Deny(DenyReason::NotTeamLeader)
        );
        for op in AccessOperation::ALL {
            assert!(engine().decide(&leader, &ws, op).is_allowed());
            assert_eq!(
                engine().decide(&other_leader, &ws, op),
                AccessDecision::Deny(DenyReason::NotTeamMember)
            );
        }
    }

    #[test]
    fn test_team_shared_and_library_read_visibility() {
        for kind in [TeamKind::Ordinary, TeamKind::Library] {
            let ws = WorkspaceDescriptor::team("lib", Visibility::Shared, "o1", kind);
            let member = requester(Actor::new("a1", "o1").in_team("lib"));
            let colleague = requester(Actor::new("a2", "o1").in_team("t2"));
            let loner = requester(Actor::new("a3", "o1"));
            let outsider = requester(Actor::new("x1", "o2").in_team("lib-o2"));

            assert!(engine().decide(&member, &ws, AccessOperation::Write).is_allowed());
            assert!(engine().decide(&colleague, &ws, AccessOperation::Read).is_allowed());
            assert!(engine().decide(&loner, &ws, AccessOperation::Read).is_allowed());
            assert_eq!(
                engine().decide(&colleague, &ws, AccessOperation::Delete),
                AccessDecision::Deny(DenyReason::NotTeamMember)
            );
            assert_eq!(
                engine().decide(&outsider, &ws, AccessOperation::Read),
                AccessDecision::Deny(DenyReason::OutsideOrganization)
            );
        }
    }

    #[test]
    fn test_leadership_reads_shared_never_private() {
        let chief = Requester::new(Actor::new("ceo", "o1").in_team("exec"), Some(TeamKind::Leadership));
        let foreign_chief =
            Requester::new(Actor::new("ceo2", "o2").in_team("exec2"), Some(TeamKind::Leadership));

        let shared = WorkspaceDescriptor::team("t1", Visibility::Shared, "o1", TeamKind::Ordinary);
        let private = WorkspaceDescriptor::team("t1", Visibility::Private, "o1", TeamKind::Ordinary);

        assert!(engine().decide(&chief, &shared, AccessOperation::Read).is_allowed());
        assert!(!engine().decide(&chief, &shared, AccessOperation::Write).is_allowed());
        assert!(!engine().decide(&chief, &private, AccessOperation::Read).is_allowed());
        assert!(!engine().decide(&foreign_chief, &shared, AccessOperation::Read).is_allowed());
    }

    #[test]
    fn test_leadership_matches_ordinary_member_outside_own_team() {
        let chief = Requester::new(Actor::new("ceo", "o1").in_team("exec"), Some(TeamKind::Leadership));
        let member = requester(Actor::new("a9", "o1").in_team("t9"));

        let workspaces = [
            WorkspaceDescriptor::agent("a1", Visibility::Shared, "o1"),
            WorkspaceDescriptor::agent("a1", Visibility::Private, "o1"),
            WorkspaceDescriptor::team("t1", Visibility::Shared, "o1", TeamKind::Ordinary),
            WorkspaceDescriptor::team("t1", Visibility::Private, "o1", TeamKind::Ordinary),
            WorkspaceDescriptor::team("lib", Visibility::Shared, "o1", TeamKind::Library),
            WorkspaceDescriptor::team("t2", Visibility::Shared, "o2", TeamKind::Ordinary),
        ];
        for ws in &workspaces {
            for op in AccessOperation::ALL {
                assert_eq!(
                    engine().decide(&chief, ws, op),
                    engine().decide(&member, ws, op),
                    "{:?} {:?}",
                    ws,
                    op
                );
            }
        }
    }

    #[test]
    fn test_unrecognized_workspaces_default_deny() {
        let actor = requester(Actor::new("a1", "o1").in_team("t1"));

        let unresolved = WorkspaceDescriptor {
            owner: WorkspaceOwner::Agent("a1".into()),
            visibility: Visibility::Private,
            organization_id: None,
            owner_team_kind: None,
        };
        let odd_visibility = WorkspaceDescriptor {
            owner: WorkspaceOwner::Team(TeamId::from("t1")),
            visibility: Visibility::Unrecognized("public".to_string()),
            organization_id: Some(OrganizationId::from("o1")),
            owner_team_kind: Some(TeamKind::Ordinary),
        };
        let odd_owner = WorkspaceDescriptor {
            owner: WorkspaceOwner::Unrecognized("robots".to_string()),
            visibility: Visibility::Shared,
            organization_id: Some(OrganizationId::from("o1")),
            owner_team_kind: None,
        };

        for ws in [&unresolved, &odd_visibility, &odd_owner] {
            for op in AccessOperation::ALL {
                assert_eq!(
                    engine().decide(&actor, ws, op),
                    AccessDecision::Deny(DenyReason::WorkspaceNotRecognized)
                );
            }
        }
    }
}
