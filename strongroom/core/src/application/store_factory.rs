// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Store Factory - Application Layer
//!
//! Creates the concrete storage provider, audit log and directory described
//! by a [`StoreConfigManifest`] and assembles them into a
//! [`StorageEnforcementLayer`]. Keeps the domain free of infrastructure
//! imports.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Composition root for the enforcement pipeline

use anyhow::Context;
use std::sync::Arc;

use crate::domain::audit::AuditLog;
use crate::domain::config::StoreConfigManifest;
use crate::domain::fsal::StorageEnforcementLayer;
use crate::domain::repository::RepositoryError;
use crate::domain::storage::{StorageError, StorageProvider};
use crate::infrastructure::audit::JsonlAuditLog;
use crate::infrastructure::repositories::InMemoryActorDirectory;
use crate::infrastructure::storage::LocalStorageProvider;

/// Assembled store: the enforcement layer plus handles on its collaborators
pub struct Store {
    pub layer: Arc<StorageEnforcementLayer>,
    pub audit: Arc<dyn AuditLog>,
    pub directory: Arc<InMemoryActorDirectory>,
}

/// Creates the local filesystem provider rooted at `spec.storage.root`
pub fn create_storage_provider(
    config: &StoreConfigManifest,
) -> Result<Arc<LocalStorageProvider>, StorageError> {
    Ok(Arc::new(LocalStorageProvider::new(config.storage_root())?))
}

/// Creates the JSON-lines audit log at the configured path
pub fn create_audit_log(config: &StoreConfigManifest) -> Arc<dyn AuditLog> {
    Arc::new(JsonlAuditLog::new(config.audit_log_path()))
}

/// Creates the in-memory directory from `spec.directory`
pub fn create_actor_directory(
    config: &StoreConfigManifest,
) -> Result<Arc<InMemoryActorDirectory>, RepositoryError> {
    let directory = &config.spec.directory;
    Ok(Arc::new(InMemoryActorDirectory::seeded(
        &directory.actors,
        &directory.teams,
    )?))
}

/// Validate `config` and build the full store
pub fn build_store(config: &StoreConfigManifest) -> anyhow::Result<Store> {
    config.validate().context("Invalid store configuration")?;

    let provider = create_storage_provider(config).context("Failed to open storage root")?;
    let sandbox_root = std::fs::canonicalize(provider.base_path())
        .with_context(|| format!("Failed to resolve {}", provider.base_path().display()))?;
    let audit = create_audit_log(config);
    let directory = create_actor_directory(config).context("Failed to seed actor directory")?;

    let storage: Arc<dyn StorageProvider> = provider;
    let layer = StorageEnforcementLayer::new(
        storage,
        directory.clone(),
        Arc::clone(&audit),
        config.quota_policy(),
    )
    .with_sandbox_root(sandbox_root);

    tracing::info!(
        storage_root = %config.storage_root().display(),
        audit_log = %config.audit_log_path().display(),
        actors = config.spec.directory.actors.len(),
        teams = config.spec.directory.teams.len(),
        "Store initialized"
    );

    Ok(Store {
        layer: Arc::new(layer),
        audit,
        directory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::{Actor, ActorId, Team, TeamKind};
    use crate::domain::audit::AuditFilter;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StoreConfigManifest {
        let mut config = StoreConfigManifest::default();
        config.spec.storage.root = dir.path().join("data");
        config.spec.directory.actors = vec![Actor::new("a1", "o1").in_team("t1")];
        config.spec.directory.teams = vec![Team::new("t1", "o1", TeamKind::Ordinary)];
        config
    }

    #[tokio::test]
    async fn test_build_store_writes_through() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let store = build_store(&config).unwrap();

        let a1 = ActorId::from("a1");
        store.layer.write(&a1, "agents/a1/private/notes.md", b"hi").await.unwrap();
        assert!(dir.path().join("data/o1/agents/a1/private/notes.md").exists());

        // Absolute paths under the organization root are accepted
        let absolute = std::fs::canonicalize(dir.path().join("data/o1"))
            .unwrap()
            .join("agents/a1/private/notes.md");
        let content = store
            .layer
            .read(&a1, absolute.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(content.data, b"hi");

        let entries = store.audit.query(&AuditFilter::new()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(config.audit_log_path().exists());
    }

    #[test]
    fn test_build_store_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.kind = "Other".to_string();
        assert!(build_store(&config).is_err());
    }
}
