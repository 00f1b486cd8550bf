// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Storage Provider
//!
//! Stores every organization tree under one base directory on the local
//! disk. Single-node only: there is no replication and no cross-process
//! locking, the enforcement layer's workspace locks are the only writer
//! serialization.
//!
//! Writes go to a `.strongroom-*` temporary file in the target directory and
//! are renamed into place. Those temporaries are hidden from listings and
//! usage scans.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

pub use crate::domain::storage::TEMP_FILE_PREFIX;
use crate::domain::storage::{
    DirEntry, FileAttributes, FileType, StorageError, StorageProvider, UsageScan,
};

/// Local filesystem storage provider
pub struct LocalStorageProvider {
    /// Base directory holding one subtree per organization
    base_path: PathBuf,
}

impl LocalStorageProvider {
    /// Create the provider, creating `base_path` if needed and checking that
    /// it is writable.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::IoError(format!(
                "Failed to create base directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let provider = Self { base_path };
        provider.check_writable()?;
        Ok(provider)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Join a provider path onto the base directory.
    ///
    /// Callers hand in sanitized relative paths; anything else is refused
    /// rather than resolved.
    fn resolve_path(&self, path: &Path) -> Result<PathBuf, StorageError> {
        if path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::InvalidPath(path.display().to_string()));
        }
        Ok(self.base_path.join(path))
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        let marker = self.base_path.join(format!("{}writable", TEMP_FILE_PREFIX));
        std::fs::write(&marker, b"ok").map_err(|e| {
            StorageError::IoError(format!(
                "Base directory {} is not writable: {}",
                self.base_path.display(),
                e
            ))
        })?;
        std::fs::remove_file(&marker)
            .map_err(|e| StorageError::IoError(format!("Failed to clean up write check file: {}", e)))?;
        Ok(())
    }
}

fn is_temp_name(name: &OsStr) -> bool {
    name.to_str()
        .map(|n| n.starts_with(TEMP_FILE_PREFIX))
        .unwrap_or(false)
}

fn to_utc(time: std::io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

fn file_type_of(metadata: &std::fs::Metadata) -> FileType {
    if metadata.is_dir() {
        FileType::Directory
    } else {
        FileType::File
    }
}

fn attributes_of(metadata: &std::fs::Metadata) -> FileAttributes {
    let modified = to_utc(metadata.modified()).unwrap_or_else(Utc::now);
    // Not every filesystem records birth time
    let created = to_utc(metadata.created()).unwrap_or(modified);
    let file_type = file_type_of(metadata);
    FileAttributes {
        file_type,
        size: if file_type == FileType::File { metadata.len() } else { 0 },
        created,
        modified,
    }
}

/// Temp file in the target's directory, then rename over the target
fn write_atomic(target: &Path, data: &[u8]) -> Result<(), StorageError> {
    let parent = target
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(target.display().to_string()))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| StorageError::from(e.error))?;
    Ok(())
}

fn scan(root: &Path) -> Result<UsageScan, StorageError> {
    let mut usage = UsageScan::default();
    if !root.exists() {
        return Ok(usage);
    }

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| StorageError::IoError(e.to_string()))?;
        if !entry.file_type().is_file() || is_temp_name(entry.file_name()) {
            continue;
        }
        let metadata = entry
            .metadata()
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        usage.file_count += 1;
        usage.total_bytes += metadata.len();
    }
    Ok(usage)
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let fs_path = self.resolve_path(path)?;
        let metadata = tokio::fs::metadata(&fs_path).await?;
        if metadata.is_dir() {
            return Err(StorageError::NotAFile(path.display().to_string()));
        }
        Ok(tokio::fs::read(&fs_path).await?)
    }

    async fn write_file_atomic(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let fs_path = self.resolve_path(path)?;
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&fs_path, &data))
            .await
            .map_err(|e| StorageError::IoError(format!("Write task failed: {}", e)))?
    }

    async fn delete_file(&self, path: &Path) -> Result<bool, StorageError> {
        let fs_path = self.resolve_path(path)?;
        match tokio::fs::metadata(&fs_path).await {
            Ok(metadata) if metadata.is_dir() => {
                return Err(StorageError::NotAFile(path.display().to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        match tokio::fs::remove_file(&fs_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn stat(&self, path: &Path) -> Result<FileAttributes, StorageError> {
        let fs_path = self.resolve_path(path)?;
        let metadata = tokio::fs::metadata(&fs_path).await?;
        Ok(attributes_of(&metadata))
    }

    async fn readdir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let fs_path = self.resolve_path(path)?;
        let metadata = tokio::fs::metadata(&fs_path).await?;
        if !metadata.is_dir() {
            return Err(StorageError::NotADirectory(path.display().to_string()));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&fs_path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            if is_temp_name(&name) {
                continue;
            }
            let metadata = entry.metadata().await?;
            let attributes = attributes_of(&metadata);
            entries.push(DirEntry {
                name: name.to_string_lossy().into_owned(),
                file_type: attributes.file_type,
                size: attributes.size,
                modified: attributes.modified,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn scan_usage(&self, path: &Path) -> Result<UsageScan, StorageError> {
        let fs_path = self.resolve_path(path)?;
        tokio::task::spawn_blocking(move || scan(&fs_path))
            .await
            .map_err(|e| StorageError::IoError(format!("Scan task failed: {}", e)))?
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.check_writable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider() -> (TempDir, LocalStorageProvider) {
        let dir = TempDir::new().unwrap();
        let provider = LocalStorageProvider::new(dir.path().join("store")).unwrap();
        (dir, provider)
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_reads_back() {
        let (_dir, provider) = provider();
        let path = Path::new("o1/agents/a1/shared/reports/q1.md");

        provider.write_file_atomic(path, b"hello").await.unwrap();
        assert_eq!(provider.read_file(path).await.unwrap(), b"hello");

        provider.write_file_atomic(path, b"replaced").await.unwrap();
        assert_eq!(provider.read_file(path).await.unwrap(), b"replaced");

        let attrs = provider.stat(path).await.unwrap();
        assert_eq!(attrs.file_type, FileType::File);
        assert_eq!(attrs.size, 8);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, provider) = provider();
        let path = Path::new("o1/agents/a1/private/x.txt");

        provider.write_file_atomic(path, b"x").await.unwrap();
        assert!(provider.delete_file(path).await.unwrap());
        assert!(!provider.delete_file(path).await.unwrap());
        assert!(matches!(
            provider.read_file(path).await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_readdir_and_scan_skip_temp_files() {
        let (_dir, provider) = provider();
        provider
            .write_file_atomic(Path::new("o1/teams/t1/shared/a.md"), b"aaa")
            .await
            .unwrap();
        provider
            .write_file_atomic(Path::new("o1/teams/t1/shared/sub/b.json"), b"{}")
            .await
            .unwrap();
        std::fs::write(
            provider.base_path().join("o1/teams/t1/shared/.strongroom-inflight"),
            b"partial",
        )
        .unwrap();

        let entries = provider.readdir(Path::new("o1/teams/t1/shared")).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "sub"]);
        assert_eq!(entries[1].file_type, FileType::Directory);

        let usage = provider.scan_usage(Path::new("o1/teams/t1/shared")).await.unwrap();
        assert_eq!(usage, UsageScan { file_count: 2, total_bytes: 5 });
    }

    #[tokio::test]
    async fn test_scan_of_missing_directory_is_empty() {
        let (_dir, provider) = provider();
        let usage = provider.scan_usage(Path::new("o9/agents/nobody/private")).await.unwrap();
        assert_eq!(usage, UsageScan::default());
    }

    #[tokio::test]
    async fn test_rejects_unsanitized_paths() {
        let (_dir, provider) = provider();
        assert!(matches!(
            provider.read_file(Path::new("../escape.md")).await.unwrap_err(),
            StorageError::InvalidPath(_)
        ));
        assert!(matches!(
            provider.stat(Path::new("/etc/passwd")).await.unwrap_err(),
            StorageError::InvalidPath(_)
        ));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let (_dir, provider) = provider();
        provider
            .write_file_atomic(Path::new("o1/agents/a1/shared/x.md"), b"x")
            .await
            .unwrap();
        assert!(matches!(
            provider.read_file(Path::new("o1/agents/a1/shared")).await.unwrap_err(),
            StorageError::NotAFile(_)
        ));
        assert!(matches!(
            provider.readdir(Path::new("o1/agents/a1/shared/x.md")).await.unwrap_err(),
            StorageError::NotADirectory(_)
        ));
        assert!(provider.health_check().await.is_ok());
    }
}
