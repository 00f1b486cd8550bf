// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Sanitizer Domain Service
//!
//! Normalizes caller-supplied paths to an organization-relative form and
//! rejects anything that could escape the organization root. Runs before any
//! filesystem call is made.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Traversal prevention for the storage enforcement layer

use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::domain::storage::TEMP_FILE_PREFIX;

/// Rounds of percent-decoding applied before giving up on a path
const MAX_DECODE_ROUNDS: usize = 4;

/// Path sanitization errors
#[derive(Debug, Error)]
pub enum PathSanitizerError {
    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path outside organization boundary: {0}")]
    OutsideBoundary(String),

    #[error("Path too long: {0}")]
    PathTooLong(String),
}

/// Path sanitizer domain service
///
/// # Security Guarantees
/// - Rejects `..` components, including percent-encoded and double-encoded forms
/// - Rejects backslash separators and NUL bytes
/// - Accepts absolute paths only when they sit under the organization root
/// - Rejects segments that use the reserved temporary-file prefix
/// - Never touches the filesystem
pub struct PathSanitizer {
    /// Maximum allowed path length (default: 4096)
    max_path_len: usize,
}

impl PathSanitizer {
    pub fn new() -> Self {
        Self { max_path_len: 4096 }
    }

    pub fn with_max_length(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    /// Sanitize `path` and return it relative to `org_root`.
    ///
    /// # Examples
    /// ```
    /// use strongroom_core::domain::path_sanitizer::PathSanitizer;
    /// use std::path::{Path, PathBuf};
    ///
    /// let sanitizer = PathSanitizer::new();
    /// let root = Path::new("/srv/strongroom/o1");
    ///
    /// let safe = sanitizer.sanitize("agents/a1/./shared/notes.md", root).unwrap();
    /// assert_eq!(safe, PathBuf::from("agents/a1/shared/notes.md"));
    ///
    /// assert!(sanitizer.sanitize("../../etc/passwd", root).is_err());
    /// assert!(sanitizer.sanitize("agents/a1/shared/%2e%2e/%2e%2e/x.md", root).is_err());
    /// ```
    pub fn sanitize(&self, path: &str, org_root: &Path) -> Result<PathBuf, PathSanitizerError> {
        if path.len() > self.max_path_len {
            return Err(PathSanitizerError::PathTooLong(path.to_string()));
        }

        let decoded = self.decode(path)?;

        if decoded.contains('\0') {
            tracing::warn!(path = %path, "Path contains null byte");
            return Err(PathSanitizerError::InvalidPath(
                "Path contains null byte".to_string(),
            ));
        }

        if decoded.contains('\\') {
            tracing::warn!(path = %path, "Path contains backslash separator");
            return Err(PathSanitizerError::InvalidPath(
                "Path contains backslash separator".to_string(),
            ));
        }

        let candidate = PathBuf::from(&decoded);

        for component in candidate.components() {
            if component == Component::ParentDir {
                tracing::warn!(
                    path = %path,
                    "Path traversal attempt detected: contains '..' component"
                );
                return Err(PathSanitizerError::PathTraversal(path.to_string()));
            }
        }

        let relative = if candidate.is_absolute() {
            self.strip_root(&candidate, org_root).map_err(|e| {
                tracing::warn!(
                    path = %path,
                    root = %org_root.display(),
                    "Absolute path outside organization boundary"
                );
                e
            })?
        } else {
            candidate
        };

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => {
                    if part.to_string_lossy().starts_with(TEMP_FILE_PREFIX) {
                        tracing::warn!(path = %path, "Path uses reserved temporary-file prefix");
                        return Err(PathSanitizerError::InvalidPath(path.to_string()));
                    }
                    normalized.push(part)
                }
                Component::ParentDir => {
                    return Err(PathSanitizerError::PathTraversal(path.to_string()));
                }
                Component::Prefix(_) | Component::RootDir => {
                    return Err(PathSanitizerError::OutsideBoundary(path.to_string()));
                }
            }
        }

        Ok(normalized)
    }

    /// Percent-decode until the string stops changing.
    fn decode(&self, path: &str) -> Result<String, PathSanitizerError> {
        let mut current = path.to_string();
        for _ in 0..MAX_DECODE_ROUNDS {
            let next = percent_decode_str(&current)
                .decode_utf8()
                .map_err(|_| PathSanitizerError::InvalidPath(path.to_string()))?
                .into_owned();
            if next == current {
                return Ok(current);
            }
            current = next;
        }
        tracing::warn!(path = %path, "Path is still encoded after repeated decoding");
        Err(PathSanitizerError::InvalidPath(path.to_string()))
    }

    /// Strip `root` from an absolute path
    pub fn strip_root(&self, absolute_path: &Path, root: &Path) -> Result<PathBuf, PathSanitizerError> {
        absolute_path
            .strip_prefix(root)
            .map(|p| p.to_path_buf())
            .map_err(|_| PathSanitizerError::OutsideBoundary(absolute_path.display().to_string()))
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> &'static Path {
        Path::new("/srv/strongroom/o1")
    }

    #[test]
    fn test_simple_path() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.sanitize("agents/a1/shared/report.md", root()).unwrap();
        assert_eq!(result, PathBuf::from("agents/a1/shared/report.md"));
    }

    #[test]
    fn test_reject_parent_dir() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.sanitize("../../etc/passwd", root());
        assert!(matches!(result.unwrap_err(), PathSanitizerError::PathTraversal(_)));

        let result = sanitizer.sanitize("agents/a1/shared/../../a2/private/x.md", root());
        assert!(matches!(result.unwrap_err(), PathSanitizerError::PathTraversal(_)));
    }

    #[test]
    fn test_reject_encoded_traversal() {
        let sanitizer = PathSanitizer::new();
        assert!(sanitizer.sanitize("%2e%2e/%2e%2e/etc/passwd", root()).is_err());
        assert!(sanitizer.sanitize("agents/a1/shared/..%2f..%2fsecret.md", root()).is_err());
        // Double-encoded: %252e -> %2e -> .
        assert!(sanitizer.sanitize("%252e%252e/etc/passwd", root()).is_err());
    }

    #[test]
    fn test_reject_backslash_and_null() {
        let sanitizer = PathSanitizer::new();
        assert!(matches!(
            sanitizer.sanitize("agents\\a1\\shared\\x.md", root()).unwrap_err(),
            PathSanitizerError::InvalidPath(_)
        ));
        assert!(matches!(
            sanitizer.sanitize("agents/a1/shared/x.md%00.txt", root()).unwrap_err(),
            PathSanitizerError::InvalidPath(_)
        ));
    }

    #[test]
    fn test_reject_reserved_prefix() {
        let sanitizer = PathSanitizer::new();
        for path in [
            "agents/a1/private/.strongroom-0.md",
            "agents/a1/private/.strongroom-dir/x.md",
            "agents/a1/private/%2estrongroom-1.md",
        ] {
            assert!(
                matches!(
                    sanitizer.sanitize(path, root()).unwrap_err(),
                    PathSanitizerError::InvalidPath(_)
                ),
                "{path}"
            );
        }
        // Only the exact prefix is reserved
        assert!(sanitizer.sanitize("agents/a1/private/.strongroom.md", root()).is_ok());
        assert!(sanitizer.sanitize("agents/a1/private/strongroom-notes.md", root()).is_ok());
    }

    #[test]
    fn test_normalize_current_dir() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.sanitize("./agents/./a1/shared//x.md", root()).unwrap();
        assert_eq!(result, PathBuf::from("agents/a1/shared/x.md"));
    }

    #[test]
    fn test_absolute_path_inside_root() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer
            .sanitize("/srv/strongroom/o1/teams/t1/shared/plan.md", root())
            .unwrap();
        assert_eq!(result, PathBuf::from("teams/t1/shared/plan.md"));
    }

    #[test]
    fn test_absolute_path_outside_root() {
        let sanitizer = PathSanitizer::new();
        assert!(matches!(
            sanitizer.sanitize("/etc/passwd", root()).unwrap_err(),
            PathSanitizerError::OutsideBoundary(_)
        ));
        assert!(matches!(
            sanitizer.sanitize("/srv/strongroom/o2/agents/a9/private/x.md", root()).unwrap_err(),
            PathSanitizerError::OutsideBoundary(_)
        ));
    }

    #[test]
    fn test_path_too_long() {
        let sanitizer = PathSanitizer::with_max_length(10);
        let result = sanitizer.sanitize("agents/a1/shared/long.md", root());
        assert!(matches!(result.unwrap_err(), PathSanitizerError::PathTooLong(_)));
    }
}
