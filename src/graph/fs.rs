// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Filesystem capability
//!
//! Everything the engine does to disk goes through [`FileSystem`], so the
//! scheduler can be exercised against a scratch directory or a fake.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{checksum_files, FileListing};
use crate::errors::{StepflowError, StepflowResult};

/// Filesystem operations used by the step engine
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Resolve a listing under `root` into relative file paths
    async fn list(&self, root: &Path, listing: &FileListing) -> StepflowResult<Vec<PathBuf>>;

    /// Content checksum over a file set rooted at `root`
    async fn checksum(&self, root: &Path, files: &[PathBuf]) -> StepflowResult<String>;

    /// Whether a path exists
    async fn exists(&self, path: &Path) -> bool;

    /// Remove a directory (if present) and create it empty
    async fn replace_dir(&self, path: &Path) -> StepflowResult<()>;

    /// Create a directory and its parents
    async fn create_dir(&self, path: &Path) -> StepflowResult<()>;

    /// Copy a file, creating the destination's parent directories
    async fn copy_file(&self, from: &Path, to: &Path) -> StepflowResult<()>;

    /// Read a UTF-8 file, `None` if it does not exist
    async fn read_file(&self, path: &Path) -> StepflowResult<Option<String>>;

    /// Write a file, creating parent directories
    async fn write_file(&self, path: &Path, contents: &str) -> StepflowResult<()>;
}

/// [`FileSystem`] backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn write_error(path: &Path, e: impl ToString) -> StepflowError {
    StepflowError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn list(&self, root: &Path, listing: &FileListing) -> StepflowResult<Vec<PathBuf>> {
        let root = root.to_path_buf();
        let listing = listing.clone();
        tokio::task::spawn_blocking(move || listing.resolve(&root)).await?
    }

    async fn checksum(&self, root: &Path, files: &[PathBuf]) -> StepflowResult<String> {
        let root = root.to_path_buf();
        let files = files.to_vec();
        tokio::task::spawn_blocking(move || checksum_files(&root, &files)).await?
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn replace_dir(&self, path: &Path) -> StepflowResult<()> {
        if self.exists(path).await {
            tokio::fs::remove_dir_all(path)
                .await
                .map_err(|e| write_error(path, e))?;
        }
        self.create_dir(path).await
    }

    async fn create_dir(&self, path: &Path) -> StepflowResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| write_error(path, e))
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> StepflowResult<()> {
        if let Some(parent) = to.parent() {
            self.create_dir(parent).await?;
        }
        tokio::fs::copy(from, to)
            .await
            .map_err(|e| write_error(to, e))?;
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> StepflowResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StepflowError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            }),
        }
    }

    async fn write_file(&self, path: &Path, contents: &str) -> StepflowResult<()> {
        if let Some(parent) = path.parent() {
            self.create_dir(parent).await?;
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| write_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_replace_dir_clears_contents() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let target = dir.path().join("out");

        fs.write_file(&target.join("stale.txt"), "old").await.unwrap();
        fs.replace_dir(&target).await.unwrap();

        assert!(fs.exists(&target).await);
        assert!(!fs.exists(&target.join("stale.txt")).await);
    }

    #[tokio::test]
    async fn test_copy_creates_parents() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("deep/nested/a.txt");

        fs.write_file(&src, "content").await.unwrap();
        fs.copy_file(&src, &dst).await.unwrap();

        assert_eq!(fs.read_file(&dst).await.unwrap().as_deref(), Some("content"));
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        assert!(fs.read_file(&dir.path().join("nope")).await.unwrap().is_none());
    }
}
