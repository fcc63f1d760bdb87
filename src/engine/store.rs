// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! On-disk state layout
//!
//! ```text
//! <state>/manifests/<project>/<flow>/<step>.json
//! <state>/artifacts/<project>/<flow>/<step>/<artifact>/
//! ```
//!
//! External tooling reads this layout directly; keep the keying stable.

use std::path::{Path, PathBuf};

use crate::errors::StepflowResult;
use crate::graph::FileSystem;
use crate::pipeline::{Artifact, Manifest, StepKey};

const MANIFESTS_DIR: &str = "manifests";
const ARTIFACTS_DIR: &str = "artifacts";

/// Maps step keys to state paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self, key: &StepKey) -> PathBuf {
        self.root
            .join(MANIFESTS_DIR)
            .join(&key.project)
            .join(&key.flow)
            .join(format!("{}.json", key.step))
    }

    /// Folder holding every artifact of a step; replaced on each run
    pub fn step_output_dir(&self, key: &StepKey) -> PathBuf {
        self.root
            .join(ARTIFACTS_DIR)
            .join(&key.project)
            .join(&key.flow)
            .join(&key.step)
    }

    pub fn artifact_dir(&self, key: &StepKey, artifact_id: &str) -> PathBuf {
        self.step_output_dir(key).join(artifact_id)
    }

    /// Resolved display links of an artifact
    pub fn artifact_links(&self, key: &StepKey, artifact: &Artifact) -> Vec<String> {
        let dir = self.artifact_dir(key, &artifact.id);
        artifact.links.iter().map(|link| link.resolve(&dir)).collect()
    }

    /// Read the last manifest of a step.
    ///
    /// An unreadable manifest is reported as missing so the step looks
    /// unbuilt rather than blocking every later status query.
    pub async fn read_manifest(
        &self,
        fs: &dyn FileSystem,
        key: &StepKey,
    ) -> StepflowResult<Option<Manifest>> {
        let path = self.manifest_path(key);
        let Some(content) = fs.read_file(&path).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&content) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                tracing::warn!(step = %key, path = %path.display(), "ignoring corrupt manifest: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn write_manifest(
        &self,
        fs: &dyn FileSystem,
        key: &StepKey,
        manifest: &Manifest,
    ) -> StepflowResult<()> {
        let content = serde_json::to_string_pretty(manifest)?;
        fs.write_file(&self.manifest_path(key), &content).await
    }
}
