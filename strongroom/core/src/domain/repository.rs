// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Directory Interfaces
//!
//! Read-only lookup of actors and teams. The directory is owned by an
//! external identity provider; the enforcement layer only ever reads from it.
//! Implemented in `crate::infrastructure::repositories`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::actor::{Actor, ActorId, Team, TeamId};

/// Actor and team lookup by identifier
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// Find actor by ID
    async fn find_actor(&self, id: &ActorId) -> Result<Option<Actor>, RepositoryError>;

    /// Find team by ID
    async fn find_team(&self, id: &TeamId) -> Result<Option<Team>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
