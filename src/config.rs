// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Workspace configuration
//!
//! Read from `stepflow.toml` at the workspace root. Every field has a
//! default, so a missing file is the same as an empty one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{StepflowError, StepflowResult};

/// Workspace configuration file name
pub const CONFIG_FILE: &str = "stepflow.toml";

/// Top-level `stepflow.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub discovery: DiscoverySettings,
}

/// `[engine]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Where manifests and artifacts are stored, relative to the workspace
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Shell used to run command templates
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Extra environment for every command run
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            shell: default_shell(),
            env: BTreeMap::new(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".stepflow")
}

fn default_shell() -> String {
    "sh".to_string()
}

/// `[discovery]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Project descriptor file name
    #[serde(default = "default_descriptor")]
    pub descriptor: String,

    /// Globs (relative to the workspace) never searched for descriptors
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            descriptor: default_descriptor(),
            ignore: default_ignore(),
        }
    }
}

fn default_descriptor() -> String {
    "stepflow.yaml".to_string()
}

fn default_ignore() -> Vec<String> {
    vec![
        ".stepflow/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
    ]
}

impl WorkspaceConfig {
    /// Load `stepflow.toml` from the workspace root, or defaults if absent
    pub fn load(workspace: &Path) -> StepflowResult<Self> {
        let path = workspace.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| StepflowError::FileReadError {
            path: path.clone(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML
    pub fn from_toml(content: &str) -> StepflowResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Absolute state directory for a workspace
    pub fn state_dir(&self, workspace: &Path) -> PathBuf {
        if self.engine.state_dir.is_absolute() {
            self.engine.state_dir.clone()
        } else {
            workspace.join(&self.engine.state_dir)
        }
    }
}
