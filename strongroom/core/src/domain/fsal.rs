// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage Enforcement Layer
//!
//! Security membrane between callers and the workspace file store. Every
//! operation runs the same pipeline:
//!
//! 1. Resolve the requester in the actor directory
//! 2. Sanitize the path against the requester's organization root (no
//!    filesystem call happens before this)
//! 3. Derive the workspace descriptor and ask the [`AccessDecisionEngine`]
//! 4. Validate extension, size and quota (writes)
//! 5. Perform the I/O through the [`StorageProvider`]
//! 6. Update the quota counters
//! 7. Append one [`AuditEntry`], success or failure
//!
//! Mutating operations hold the workspace lock from step 4 through step 7.

use crate::domain::{
    access::{AccessDecision, AccessDecisionEngine, AccessOperation, Requester},
    actor::{ActorId, OrganizationId},
    audit::{AuditEntry, AuditErrorKind, AuditLog, AuditOperation},
    path_sanitizer::PathSanitizer,
    quota::{QuotaCheck, QuotaPolicy, QuotaTracker, QuotaUsage, QuotaWarning, WorkspaceGuard},
    repository::ActorDirectory,
    storage::{FileAttributes, FileType, StorageError, StorageProvider},
    workspace::{Visibility, WorkspaceClass, WorkspaceDescriptor, WorkspaceKey, WorkspaceLocation, WorkspaceOwner},
};
use crate::metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// File extensions accepted for writes, reads and file stats
pub const ALLOWED_EXTENSIONS: [&str; 9] =
    ["md", "txt", "pdf", "json", "yaml", "svg", "png", "jpg", "jpeg"];

/// Per-file size ceiling (5 MiB)
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Errors returned to callers of the enforcement layer.
///
/// Messages never include absolute paths or OS error text.
#[derive(Debug, Error)]
pub enum EnforcementError {
    #[error("Access denied to {class} workspace")]
    AccessDenied { class: WorkspaceClass },

    #[error("File extension not allowed: '{extension}'")]
    InvalidExtension { extension: String },

    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error(
        "Workspace quota exceeded: {} files / {} bytes would pass the hard ceiling",
        .usage.file_count,
        .usage.total_bytes
    )]
    QuotaExceeded { usage: QuotaUsage },

    #[error("Path rejected: outside the organization root")]
    PathTraversal,

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Internal storage error")]
    Internal,
}

impl EnforcementError {
    pub fn kind(&self) -> AuditErrorKind {
        match self {
            EnforcementError::AccessDenied { .. } => AuditErrorKind::AccessDenied,
            EnforcementError::InvalidExtension { .. } => AuditErrorKind::InvalidExtension,
            EnforcementError::FileTooLarge { .. } => AuditErrorKind::FileTooLarge,
            EnforcementError::QuotaExceeded { .. } => AuditErrorKind::QuotaExceeded,
            EnforcementError::PathTraversal => AuditErrorKind::PathTraversal,
            EnforcementError::NotFound { .. } => AuditErrorKind::NotFound,
            EnforcementError::Internal => AuditErrorKind::InternalError,
        }
    }
}

/// Log the detail server-side and hand the caller a generic failure
fn internal(context: &'static str, err: impl std::fmt::Display) -> EnforcementError {
    error!(context, error = %err, "Storage enforcement internal error");
    EnforcementError::Internal
}

/// File content with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub data: Vec<u8>,
    pub attributes: FileAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub path: String,
    pub bytes_written: u64,
    /// False when an existing file was replaced
    pub created: bool,
    /// Set when the write crossed the workspace's soft ceiling
    pub quota_warning: Option<QuotaWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub from: String,
    pub to: String,
    pub bytes_moved: u64,
    pub quota_warning: Option<QuotaWarning>,
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    /// Organization-relative path
    pub path: String,
    pub is_directory: bool,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Reject anything outside the extension whitelist (case-insensitive)
pub fn check_extension(path: &Path) -> Result<(), EnforcementError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(EnforcementError::InvalidExtension { extension })
    }
}

pub fn check_size(size: u64) -> Result<(), EnforcementError> {
    if size > MAX_FILE_BYTES {
        return Err(EnforcementError::FileTooLarge {
            size,
            max: MAX_FILE_BYTES,
        });
    }
    Ok(())
}

/// Audit entry under construction for one attempt
struct AuditDraft {
    operation: AuditOperation,
    path: String,
    byte_size: Option<u64>,
}

impl AuditDraft {
    fn new(operation: AuditOperation, path: &str) -> Self {
        Self {
            operation,
            path: path.to_string(),
            byte_size: None,
        }
    }

    fn into_entry(self, actor_id: &ActorId, failure: Option<AuditErrorKind>) -> AuditEntry {
        match failure {
            None => AuditEntry::success(actor_id.clone(), self.operation, self.path, self.byte_size),
            Some(kind) => {
                AuditEntry::failure(actor_id.clone(), self.operation, self.path, self.byte_size, kind)
            }
        }
    }
}

/// A sanitized path placed in the layout
struct Target {
    /// Organization-relative path
    relative: PathBuf,
    /// Provider path, `<org>/<relative>`
    storage_path: PathBuf,
    /// Provider path of the enclosing workspace root
    workspace_root: PathBuf,
    location: WorkspaceLocation,
    key: WorkspaceKey,
}

impl Target {
    fn new(organization_id: &OrganizationId, relative: PathBuf) -> Self {
        let org_dir = PathBuf::from(organization_id.as_str());
        let location = WorkspaceLocation::parse(&relative);
        Self {
            storage_path: org_dir.join(&relative),
            workspace_root: org_dir.join(location.root()),
            key: WorkspaceKey {
                organization_id: organization_id.clone(),
                owner: location.owner.clone(),
                visibility: location.visibility.clone(),
            },
            relative,
            location,
        }
    }

    fn display(&self) -> String {
        self.relative.to_string_lossy().into_owned()
    }

    fn is_workspace(&self) -> bool {
        !matches!(self.location.owner, WorkspaceOwner::Unrecognized(_))
            && !matches!(self.location.visibility, Visibility::Unrecognized(_))
    }
}

/// Map provider errors for a caller-visible target
fn storage_failure(err: StorageError, target: &Target) -> EnforcementError {
    match err {
        StorageError::NotFound(_) | StorageError::NotAFile(_) | StorageError::NotADirectory(_) => {
            EnforcementError::NotFound {
                path: target.display(),
            }
        }
        other => internal("storage provider", other),
    }
}

/// Organization ids become a directory name, so they must be one plain segment
fn check_org_segment(organization_id: &OrganizationId) -> Result<(), EnforcementError> {
    let raw = organization_id.as_str();
    let mut components = Path::new(raw).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || raw.contains('\\') {
        return Err(internal("organization id", format!("unusable organization id '{}'", raw)));
    }
    Ok(())
}

/// Storage Enforcement Layer
///
/// Domain entity gating all workspace file operations. Cheap to share behind
/// an `Arc`; every method takes `&self`.
pub struct StorageEnforcementLayer {
    storage: Arc<dyn StorageProvider>,
    directory: Arc<dyn ActorDirectory>,
    audit: Arc<dyn AuditLog>,
    quota: QuotaTracker,
    engine: AccessDecisionEngine,
    path_sanitizer: PathSanitizer,
    /// Absolute location of the store as callers see it. Absolute request
    /// paths are accepted only beneath `<sandbox_root>/<org>`.
    sandbox_root: PathBuf,
}

impl StorageEnforcementLayer {
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        directory: Arc<dyn ActorDirectory>,
        audit: Arc<dyn AuditLog>,
        policy: QuotaPolicy,
    ) -> Self {
        Self {
            storage,
            directory,
            audit,
            quota: QuotaTracker::new(policy),
            engine: AccessDecisionEngine::new(),
            path_sanitizer: PathSanitizer::new(),
            sandbox_root: PathBuf::new(),
        }
    }

    pub fn with_sandbox_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sandbox_root = root.into();
        self
    }

    pub fn quota_policy(&self) -> &QuotaPolicy {
        self.quota.policy()
    }

    pub fn audit_log(&self) -> Arc<dyn AuditLog> {
        Arc::clone(&self.audit)
    }

    /// Read a whole file
    pub async fn read(&self, actor_id: &ActorId, path: &str) -> Result<FileContent, EnforcementError> {
        let mut draft = AuditDraft::new(AuditOperation::Read, path);
        let result = self.read_inner(actor_id, path, &mut draft).await;
        self.finish(actor_id, draft, result).await
    }

    /// Create or replace a file
    pub async fn write(
        &self,
        actor_id: &ActorId,
        path: &str,
        content: &[u8],
    ) -> Result<WriteOutcome, EnforcementError> {
        let mut draft = AuditDraft::new(AuditOperation::Create, path);
        draft.byte_size = Some(content.len() as u64);
        let mut lock = None;
        let result = self.write_inner(actor_id, path, content, &mut draft, &mut lock).await;
        let result = self.finish(actor_id, draft, result).await;
        drop(lock);
        result
    }

    /// Delete a file. Returns `false` when there was nothing to delete.
    pub async fn delete(&self, actor_id: &ActorId, path: &str) -> Result<bool, EnforcementError> {
        let mut draft = AuditDraft::new(AuditOperation::Delete, path);
        let mut lock = None;
        let result = self.delete_inner(actor_id, path, &mut draft, &mut lock).await;
        let result = self.finish(actor_id, draft, result).await;
        drop(lock);
        result
    }

    /// List a directory
    pub async fn list(&self, actor_id: &ActorId, path: &str) -> Result<Vec<ListEntry>, EnforcementError> {
        let mut draft = AuditDraft::new(AuditOperation::Read, path);
        let result = self.list_inner(actor_id, path, &mut draft).await;
        self.finish(actor_id, draft, result).await
    }

    /// File or directory metadata
    pub async fn stat(&self, actor_id: &ActorId, path: &str) -> Result<FileAttributes, EnforcementError> {
        let mut draft = AuditDraft::new(AuditOperation::Read, path);
        let result = self.stat_inner(actor_id, path, &mut draft).await;
        self.finish(actor_id, draft, result).await
    }

    /// Move a file. Audited as a `delete` of `from` followed by a `create`
    /// of `to`; on failure both entries carry the error kind.
    pub async fn move_file(
        &self,
        actor_id: &ActorId,
        from: &str,
        to: &str,
    ) -> Result<MoveOutcome, EnforcementError> {
        let mut removal = AuditDraft::new(AuditOperation::Delete, from);
        let mut creation = AuditDraft::new(AuditOperation::Create, to);
        let mut locks = None;
        let result = self
            .move_inner(actor_id, from, to, &mut removal, &mut creation, &mut locks)
            .await;
        let failure = result.as_ref().err().map(|e| e.kind());
        self.record(&removal.into_entry(actor_id, failure)).await;
        self.record(&creation.into_entry(actor_id, failure)).await;
        drop(locks);
        result
    }

    /// Usage of the workspace containing `path` (read access required)
    pub async fn quota_usage(&self, actor_id: &ActorId, path: &str) -> Result<QuotaUsage, EnforcementError> {
        let mut draft = AuditDraft::new(AuditOperation::Read, path);
        let result = self.quota_usage_inner(actor_id, path, &mut draft).await;
        self.finish(actor_id, draft, result).await
    }

    /// Drop the in-memory counters of the workspace containing `path` and
    /// rescan its directory. Operator operation: no actor, not audited.
    pub async fn rebuild_quota(
        &self,
        organization_id: &OrganizationId,
        path: &str,
    ) -> Result<QuotaUsage, EnforcementError> {
        check_org_segment(organization_id)?;
        let relative = self
            .path_sanitizer
            .sanitize(path, &self.sandbox_root.join(organization_id.as_str()))
            .map_err(|e| {
                warn!(error = %e, "Rejected quota rebuild path");
                EnforcementError::PathTraversal
            })?;
        let target = Target::new(organization_id, relative);
        if !target.is_workspace() {
            return Err(EnforcementError::NotFound {
                path: target.display(),
            });
        }

        let mut guard = self.quota.lock(&target.key).await;
        guard.invalidate();
        self.ensure_loaded(&mut guard, &target.workspace_root).await?;
        let usage = guard.usage();
        info!(
            workspace = %target.key,
            files = usage.file_count,
            bytes = usage.total_bytes,
            "Rebuilt workspace quota counters"
        );
        Ok(usage)
    }

    async fn read_inner(
        &self,
        actor_id: &ActorId,
        path: &str,
        draft: &mut AuditDraft,
    ) -> Result<FileContent, EnforcementError> {
        let target = self.admit(actor_id, path, AccessOperation::Read, draft).await?;
        check_extension(&target.relative)?;

        let mut attributes = self
            .storage
            .stat(&target.storage_path)
            .await
            .map_err(|e| storage_failure(e, &target))?;
        if attributes.file_type != FileType::File {
            return Err(EnforcementError::NotFound {
                path: target.display(),
            });
        }
        let data = self
            .storage
            .read_file(&target.storage_path)
            .await
            .map_err(|e| storage_failure(e, &target))?;

        attributes.size = data.len() as u64;
        draft.byte_size = Some(attributes.size);
        debug!(actor_id = %actor_id, path = %target.display(), bytes = attributes.size, "File read");
        Ok(FileContent { data, attributes })
    }

    async fn write_inner(
        &self,
        actor_id: &ActorId,
        path: &str,
        content: &[u8],
        draft: &mut AuditDraft,
        lock: &mut Option<WorkspaceGuard>,
    ) -> Result<WriteOutcome, EnforcementError> {
        let target = self.admit(actor_id, path, AccessOperation::Write, draft).await?;
        let size = content.len() as u64;
        check_extension(&target.relative)?;
        check_size(size)?;

        let guard = lock.insert(self.quota.lock(&target.key).await);
        self.ensure_loaded(guard, &target.workspace_root).await?;

        let previous = self.existing_file_size(&target).await?;
        if previous.is_some() {
            draft.operation = AuditOperation::Update;
        }

        let quota_warning = match guard.check_write(previous, size) {
            QuotaCheck::WithinLimit => None,
            QuotaCheck::SoftLimit(warning) => Some(warning),
            QuotaCheck::HardLimit(usage) => {
                warn!(
                    actor_id = %actor_id,
                    workspace = %target.key,
                    files = usage.file_count,
                    bytes = usage.total_bytes,
                    "Write rejected at hard quota ceiling"
                );
                return Err(EnforcementError::QuotaExceeded { usage });
            }
        };

        self.storage
            .write_file_atomic(&target.storage_path, content)
            .await
            .map_err(|e| internal("atomic write", e))?;
        guard.record_write(previous, size);

        if let Some(warning) = &quota_warning {
            metrics::record_quota_warning();
            warn!(
                workspace = %target.key,
                file_percent = warning.file_percent,
                byte_percent = warning.byte_percent,
                "Workspace crossed soft quota ceiling"
            );
        }
        debug!(
            actor_id = %actor_id,
            path = %target.display(),
            bytes = size,
            created = previous.is_none(),
            "File written"
        );

        Ok(WriteOutcome {
            path: target.display(),
            bytes_written: size,
            created: previous.is_none(),
            quota_warning,
        })
    }

    async fn delete_inner(
        &self,
        actor_id: &ActorId,
        path: &str,
        draft: &mut AuditDraft,
        lock: &mut Option<WorkspaceGuard>,
    ) -> Result<bool, EnforcementError> {
        let target = self.admit(actor_id, path, AccessOperation::Delete, draft).await?;

        let guard = lock.insert(self.quota.lock(&target.key).await);
        self.ensure_loaded(guard, &target.workspace_root).await?;

        let Some(size) = self.existing_file_size(&target).await? else {
            debug!(actor_id = %actor_id, path = %target.display(), "Delete of missing file is a no-op");
            return Ok(false);
        };
        draft.byte_size = Some(size);

        let removed = self
            .storage
            .delete_file(&target.storage_path)
            .await
            .map_err(|e| internal("delete", e))?;
        if removed {
            guard.record_delete(size);
        }
        debug!(actor_id = %actor_id, path = %target.display(), removed, "File deleted");
        Ok(removed)
    }

    async fn list_inner(
        &self,
        actor_id: &ActorId,
        path: &str,
        draft: &mut AuditDraft,
    ) -> Result<Vec<ListEntry>, EnforcementError> {
        let target = self.admit(actor_id, path, AccessOperation::Read, draft).await?;
        let entries = self
            .storage
            .readdir(&target.storage_path)
            .await
            .map_err(|e| storage_failure(e, &target))?;

        Ok(entries
            .into_iter()
            .map(|entry| ListEntry {
                path: target.relative.join(&entry.name).to_string_lossy().into_owned(),
                is_directory: entry.file_type == FileType::Directory,
                size: entry.size,
                modified: entry.modified,
            })
            .collect())
    }

    async fn stat_inner(
        &self,
        actor_id: &ActorId,
        path: &str,
        draft: &mut AuditDraft,
    ) -> Result<FileAttributes, EnforcementError> {
        let target = self.admit(actor_id, path, AccessOperation::Read, draft).await?;
        // Directories have no extension; named files must be whitelisted.
        if target.relative.extension().is_some() {
            check_extension(&target.relative)?;
        }

        let attributes = self
            .storage
            .stat(&target.storage_path)
            .await
            .map_err(|e| storage_failure(e, &target))?;
        if attributes.file_type == FileType::File {
            draft.byte_size = Some(attributes.size);
        }
        Ok(attributes)
    }

    async fn move_inner(
        &self,
        actor_id: &ActorId,
        from: &str,
        to: &str,
        removal: &mut AuditDraft,
        creation: &mut AuditDraft,
        locks: &mut Option<(WorkspaceGuard, Option<WorkspaceGuard>)>,
    ) -> Result<MoveOutcome, EnforcementError> {
        let requester = self.requester(actor_id).await?;
        let source = self.resolve(&requester, from, removal)?;
        let destination = self.resolve(&requester, to, creation)?;
        let source_ws = self.describe(&source.location).await?;
        let destination_ws = self.describe(&destination.location).await?;
        self.authorize(&requester, &source, &source_ws, AccessOperation::Delete)?;
        self.authorize(&requester, &destination, &destination_ws, AccessOperation::Write)?;
        check_extension(&destination.relative)?;

        let (first, second) = self.quota.lock_pair(&source.key, &destination.key).await;
        let (source_guard, destination_guard) = locks.insert((first, second));
        self.ensure_loaded(source_guard, &source.workspace_root).await?;
        if let Some(guard) = destination_guard.as_mut() {
            self.ensure_loaded(guard, &destination.workspace_root).await?;
        }

        let data = self
            .storage
            .read_file(&source.storage_path)
            .await
            .map_err(|e| storage_failure(e, &source))?;
        let size = data.len() as u64;
        removal.byte_size = Some(size);
        creation.byte_size = Some(size);
        check_size(size)?;

        if source.relative == destination.relative {
            return Ok(MoveOutcome {
                from: source.display(),
                to: destination.display(),
                bytes_moved: size,
                quota_warning: None,
            });
        }

        let previous = self.existing_file_size(&destination).await?;
        // Within one workspace a move never grows usage.
        let quota_warning = match destination_guard.as_ref().map(|g| g.check_write(previous, size)) {
            None | Some(QuotaCheck::WithinLimit) => None,
            Some(QuotaCheck::SoftLimit(warning)) => Some(warning),
            Some(QuotaCheck::HardLimit(usage)) => {
                warn!(
                    actor_id = %actor_id,
                    workspace = %destination.key,
                    "Move rejected at hard quota ceiling"
                );
                return Err(EnforcementError::QuotaExceeded { usage });
            }
        };

        self.storage
            .delete_file(&source.storage_path)
            .await
            .map_err(|e| internal("move: remove source", e))?;

        if let Err(write_err) = self.storage.write_file_atomic(&destination.storage_path, &data).await {
            if let Err(restore_err) = self.storage.write_file_atomic(&source.storage_path, &data).await {
                error!(
                    actor_id = %actor_id,
                    error = %restore_err,
                    "Failed to restore move source; counters will be rescanned"
                );
                source_guard.invalidate();
            }
            return Err(internal("move: write destination", write_err));
        }

        source_guard.record_delete(size);
        match destination_guard.as_mut() {
            Some(guard) => guard.record_write(previous, size),
            None => source_guard.record_write(previous, size),
        }

        if quota_warning.is_some() {
            metrics::record_quota_warning();
            warn!(workspace = %destination.key, "Workspace crossed soft quota ceiling");
        }
        debug!(
            actor_id = %actor_id,
            from = %source.display(),
            to = %destination.display(),
            bytes = size,
            "File moved"
        );

        Ok(MoveOutcome {
            from: source.display(),
            to: destination.display(),
            bytes_moved: size,
            quota_warning,
        })
    }

    async fn quota_usage_inner(
        &self,
        actor_id: &ActorId,
        path: &str,
        draft: &mut AuditDraft,
    ) -> Result<QuotaUsage, EnforcementError> {
        let target = self.admit(actor_id, path, AccessOperation::Read, draft).await?;
        let mut guard = self.quota.lock(&target.key).await;
        self.ensure_loaded(&mut guard, &target.workspace_root).await?;
        Ok(guard.usage())
    }

    /// Resolve, sanitize, describe and authorize in one step
    async fn admit(
        &self,
        actor_id: &ActorId,
        path: &str,
        operation: AccessOperation,
        draft: &mut AuditDraft,
    ) -> Result<Target, EnforcementError> {
        let requester = self.requester(actor_id).await?;
        let target = self.resolve(&requester, path, draft)?;
        let workspace = self.describe(&target.location).await?;
        self.authorize(&requester, &target, &workspace, operation)?;
        Ok(target)
    }

    async fn requester(&self, actor_id: &ActorId) -> Result<Requester, EnforcementError> {
        let Some(actor) = self
            .directory
            .find_actor(actor_id)
            .await
            .map_err(|e| internal("actor lookup", e))?
        else {
            metrics::record_decision(false);
            warn!(actor_id = %actor_id, "Request from unknown actor");
            return Err(EnforcementError::AccessDenied {
                class: WorkspaceClass::Unrecognized,
            });
        };

        let team_kind = match &actor.team_id {
            Some(team_id) => self
                .directory
                .find_team(team_id)
                .await
                .map_err(|e| internal("team lookup", e))?
                .map(|team| team.kind),
            None => None,
        };
        Ok(Requester::new(actor, team_kind))
    }

    fn resolve(
        &self,
        requester: &Requester,
        path: &str,
        draft: &mut AuditDraft,
    ) -> Result<Target, EnforcementError> {
        let organization_id = &requester.actor.organization_id;
        check_org_segment(organization_id)?;

        let org_root = self.sandbox_root.join(organization_id.as_str());
        let relative = self.path_sanitizer.sanitize(path, &org_root).map_err(|e| {
            warn!(actor_id = %requester.actor.id, error = %e, "Rejected request path");
            EnforcementError::PathTraversal
        })?;

        let target = Target::new(organization_id, relative);
        if !target.relative.as_os_str().is_empty() {
            draft.path = target.display();
        }
        Ok(target)
    }

    async fn describe(&self, location: &WorkspaceLocation) -> Result<WorkspaceDescriptor, EnforcementError> {
        let (organization_id, owner_team_kind) = match &location.owner {
            WorkspaceOwner::Agent(id) => {
                let owner = self
                    .directory
                    .find_actor(id)
                    .await
                    .map_err(|e| internal("owner lookup", e))?;
                (owner.map(|a| a.organization_id), None)
            }
            WorkspaceOwner::Team(id) => match self
                .directory
                .find_team(id)
                .await
                .map_err(|e| internal("owner lookup", e))?
            {
                Some(team) => (Some(team.organization_id), Some(team.kind)),
                None => (None, None),
            },
            WorkspaceOwner::Unrecognized(_) => (None, None),
        };

        Ok(WorkspaceDescriptor {
            owner: location.owner.clone(),
            visibility: location.visibility.clone(),
            organization_id,
            owner_team_kind,
        })
    }

    fn authorize(
        &self,
        requester: &Requester,
        target: &Target,
        workspace: &WorkspaceDescriptor,
        operation: AccessOperation,
    ) -> Result<(), EnforcementError> {
        let decision = self.engine.decide(requester, workspace, operation);
        metrics::record_decision(decision.is_allowed());
        match decision {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => {
                warn!(
                    actor_id = %requester.actor.id,
                    path = %target.display(),
                    operation = ?operation,
                    reason = %reason,
                    "Access denied"
                );
                Err(EnforcementError::AccessDenied {
                    class: workspace.class(),
                })
            }
        }
    }

    /// Lazily load the workspace counters from a directory scan
    async fn ensure_loaded(&self, guard: &mut WorkspaceGuard, workspace_root: &Path) -> Result<(), EnforcementError> {
        if guard.is_loaded() {
            return Ok(());
        }
        let scan = self
            .storage
            .scan_usage(workspace_root)
            .await
            .map_err(|e| internal("quota scan", e))?;
        debug!(
            workspace = %guard.key(),
            files = scan.file_count,
            bytes = scan.total_bytes,
            "Loaded workspace quota counters"
        );
        guard.load(scan);
        Ok(())
    }

    /// Size of the file currently at `target`, `None` if absent
    async fn existing_file_size(&self, target: &Target) -> Result<Option<u64>, EnforcementError> {
        match self.storage.stat(&target.storage_path).await {
            Ok(attributes) if attributes.file_type == FileType::File => Ok(Some(attributes.size)),
            Ok(_) => Err(EnforcementError::NotFound {
                path: target.display(),
            }),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(internal("stat", e)),
        }
    }

    async fn finish<T>(
        &self,
        actor_id: &ActorId,
        draft: AuditDraft,
        result: Result<T, EnforcementError>,
    ) -> Result<T, EnforcementError> {
        let failure = result.as_ref().err().map(|e| e.kind());
        self.record(&draft.into_entry(actor_id, failure)).await;
        result
    }

    async fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.audit.record(entry).await {
            metrics::record_audit_failure();
            error!(
                actor_id = %entry.actor_id,
                operation = %entry.operation,
                error = %e,
                "Failed to persist audit entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_whitelist() {
        for ok in ["a.md", "b.TXT", "c/d.pdf", "e.json", "f.yaml", "g.svg", "h.png", "i.jpg", "j.JPEG"] {
            assert!(check_extension(Path::new(ok)).is_ok(), "{ok}");
        }
        for bad in ["a.exe", "b.yml", "c", "d.tar.gz", ".md"] {
            assert!(
                matches!(
                    check_extension(Path::new(bad)),
                    Err(EnforcementError::InvalidExtension { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_size_ceiling() {
        assert!(check_size(MAX_FILE_BYTES).is_ok());
        assert!(matches!(
            check_size(MAX_FILE_BYTES + 1),
            Err(EnforcementError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            EnforcementError::AccessDenied {
                class: WorkspaceClass::AgentPrivate
            }
            .kind(),
            AuditErrorKind::AccessDenied
        );
        assert_eq!(EnforcementError::PathTraversal.kind(), AuditErrorKind::PathTraversal);
        assert_eq!(EnforcementError::Internal.kind(), AuditErrorKind::InternalError);
    }

    #[test]
    fn test_messages_do_not_leak_detail() {
        let denied = EnforcementError::AccessDenied {
            class: WorkspaceClass::TeamPrivate,
        };
        assert_eq!(denied.to_string(), "Access denied to team-private workspace");
        assert_eq!(EnforcementError::Internal.to_string(), "Internal storage error");
    }

    #[test]
    fn test_org_segment_must_be_plain() {
        assert!(check_org_segment(&OrganizationId::from("o1")).is_ok());
        assert!(check_org_segment(&OrganizationId::from("..")).is_err());
        assert!(check_org_segment(&OrganizationId::from("o1/o2")).is_err());
        assert!(check_org_segment(&OrganizationId::from("")).is_err());
    }

    #[test]
    fn test_target_layout() {
        let target = Target::new(&OrganizationId::from("o1"), PathBuf::from("teams/t1/shared/a/b.md"));
        assert_eq!(target.storage_path, PathBuf::from("o1/teams/t1/shared/a/b.md"));
        assert_eq!(target.workspace_root, PathBuf::from("o1/teams/t1/shared"));
        assert!(target.is_workspace());
        assert_eq!(target.key.to_string(), "o1/teams/t1/shared");
    }
}
