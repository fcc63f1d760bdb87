// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Glob-based file listings
//!
//! A listing is a set of include patterns minus a set of ignore patterns,
//! evaluated against a root directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::errors::{StepflowError, StepflowResult};

/// Include/ignore glob listing evaluated against a root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    /// Patterns selecting files, relative to the root
    #[serde(default)]
    pub include: Vec<String>,

    /// Patterns removing files from the selection
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl FileListing {
    /// Listing with the given include patterns and no ignores
    pub fn new<I, S>(include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            ignore: Vec::new(),
        }
    }

    /// Add ignore patterns
    pub fn ignoring<I, S>(mut self, ignore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(ignore.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Resolve the listing to a sorted, de-duplicated list of regular files,
    /// as paths relative to `root`.
    ///
    /// A pattern matching nothing is not an error; an empty selection is a
    /// valid, fingerprintable file set.
    pub fn resolve(&self, root: &Path) -> StepflowResult<Vec<PathBuf>> {
        let ignore = self
            .ignore
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
        let mut files = BTreeSet::new();

        for pattern in &self.include {
            let full_pattern = if Path::new(pattern).is_absolute() {
                pattern.clone()
            } else {
                format!("{}/{}", escaped_root.trim_end_matches('/'), pattern)
            };

            let matches = glob::glob(&full_pattern)
                .map_err(|e| StepflowError::GlobPattern { message: e.to_string() })?;

            for path in matches.filter_map(Result::ok) {
                if !path.is_file() {
                    continue;
                }
                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                if ignore.iter().any(|p| p.matches_path(&relative)) {
                    continue;
                }
                files.insert(relative);
            }
        }

        Ok(files.into_iter().collect())
    }
}
