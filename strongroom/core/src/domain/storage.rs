// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage Provider Trait - Anti-Corruption Layer for the file store
//!
//! Isolates the enforcement layer from the concrete filesystem. Paths handed
//! to a provider are already sanitized and relative to the storage root
//! (`<org>/<agents|teams>/<owner>/<visibility>/...`); providers resolve them
//! against their own base directory and never interpret ownership.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Name prefix reserved for a provider's in-flight temporary files.
///
/// Hidden from listings and usage scans, so request paths may not use it.
pub const TEMP_FILE_PREFIX: &str = ".strongroom-";

/// File type for directory entries and attributes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
}

/// File metadata returned by [`StorageProvider::stat`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileAttributes {
    pub file_type: FileType,
    /// Size in bytes (0 for directories)
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Single entry of a directory listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirEntry {
    /// File/directory name (not including path)
    pub name: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Result of walking a workspace directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageScan {
    pub file_count: u64,
    pub total_bytes: u64,
}

/// Whole-file storage operations used by the enforcement layer.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Read the full content of a file
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    /// Replace the file at `path` with `data` atomically.
    ///
    /// Parent directories are created as needed. Content is written to a
    /// temporary file beside the target and renamed into place, so a reader
    /// observes either the old or the new content, never a mix.
    async fn write_file_atomic(&self, path: &Path, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a file.
    ///
    /// # Returns
    /// * `Ok(true)` if a file was removed
    /// * `Ok(false)` if nothing existed at `path`
    async fn delete_file(&self, path: &Path) -> Result<bool, StorageError>;

    /// Get file or directory attributes
    async fn stat(&self, path: &Path) -> Result<FileAttributes, StorageError>;

    /// List directory contents, excluding in-flight temporary files
    async fn readdir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError>;

    /// Count files and bytes beneath `path`. A missing directory is empty.
    async fn scan_usage(&self, path: &Path) -> Result<UsageScan, StorageError>;

    /// Check the backend is reachable and writable
    async fn health_check(&self) -> Result<(), StorageError>;
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(err.to_string()),
            _ => StorageError::IoError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let err: StorageError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StorageError::NotFound(_)));

        let err: StorageError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, StorageError::PermissionDenied(_)));

        let err: StorageError = std::io::Error::other("disk on fire").into();
        assert!(matches!(err, StorageError::IoError(_)));
    }

    #[test]
    fn test_usage_scan_default_is_empty() {
        assert_eq!(UsageScan::default(), UsageScan { file_count: 0, total_bytes: 0 });
    }
}
