// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Content checksums over file sets
//!
//! Uses BLAKE3 for fast, secure content hashing.

use blake3::Hasher;
use std::path::{Path, PathBuf};

use crate::errors::{StepflowError, StepflowResult};

/// Content hasher for step fingerprints
pub struct ContentHasher {
    hasher: Hasher,
}

impl ContentHasher {
    /// Create a new content hasher
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
        }
    }

    /// Hash one file of the set: its path, then its length and contents.
    ///
    /// The path is part of the hash so renaming, adding or removing a file
    /// changes the checksum even when contents are unchanged. A missing file
    /// hashes as a distinct marker.
    pub fn hash_entry(&mut self, root: &Path, file: &Path) -> StepflowResult<()> {
        let full = if file.is_absolute() {
            file.to_path_buf()
        } else {
            root.join(file)
        };

        self.hasher.update(file.to_string_lossy().replace('\\', "/").as_bytes());
        self.hasher.update(&[0]);

        if !full.is_file() {
            self.hasher.update(b"<missing>");
            self.hasher.update(&[0]);
            return Ok(());
        }

        let content = std::fs::read(&full).map_err(|e| StepflowError::FileReadError {
            path: full.clone(),
            error: e.to_string(),
        })?;

        self.hasher.update(&(content.len() as u64).to_le_bytes());
        self.hasher.update(&content);
        Ok(())
    }

    /// Hash arbitrary bytes
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize and get the hash
    pub fn finalize(self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Checksum a file set rooted at `root`. Order of `files` does not matter.
pub fn checksum_files(root: &Path, files: &[PathBuf]) -> StepflowResult<String> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();
    sorted.dedup();

    let mut hasher = ContentHasher::new();
    for file in sorted {
        hasher.hash_entry(root, file)?;
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "beta").unwrap();
        dir
    }

    fn files(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_checksum_is_stable_and_order_free() {
        let dir = setup();
        let one = checksum_files(dir.path(), &files(&["a.txt", "b.txt"])).unwrap();
        let two = checksum_files(dir.path(), &files(&["b.txt", "a.txt"])).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn test_content_change_changes_checksum() {
        let dir = setup();
        let before = checksum_files(dir.path(), &files(&["a.txt", "b.txt"])).unwrap();
        fs::write(dir.path().join("a.txt"), "ALPHA").unwrap();
        let after = checksum_files(dir.path(), &files(&["a.txt", "b.txt"])).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_file_set_change_changes_checksum() {
        let dir = setup();
        let both = checksum_files(dir.path(), &files(&["a.txt", "b.txt"])).unwrap();
        let one = checksum_files(dir.path(), &files(&["a.txt"])).unwrap();
        assert_ne!(both, one);
    }

    #[test]
    fn test_content_moved_between_files_differs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "ab").unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        let first = checksum_files(dir.path(), &files(&["a.txt", "b.txt"])).unwrap();

        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        let second = checksum_files(dir.path(), &files(&["a.txt", "b.txt"])).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = setup();
        let with_missing = checksum_files(dir.path(), &files(&["a.txt", "gone.txt"])).unwrap();
        let without = checksum_files(dir.path(), &files(&["a.txt"])).unwrap();
        assert_ne!(with_missing, without);
    }
}
