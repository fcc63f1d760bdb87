// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Run manifests and step status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifies one step of one flow of one project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepKey {
    pub project: String,
    pub flow: String,
    pub step: String,
}

impl StepKey {
    pub fn new(
        project: impl Into<String>,
        flow: impl Into<String>,
        step: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            flow: flow.into(),
            step: step.into(),
        }
    }

    /// Same project and flow, another step
    pub fn sibling(&self, step: impl Into<String>) -> Self {
        Self {
            project: self.project.clone(),
            flow: self.flow.clone(),
            step: step.into(),
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.flow, self.step)
    }
}

/// Outputs captured from a run.
///
/// Stored as `{"kind": "lines" | "structured", "value": ..}` so a structured
/// result that happens to be a string array reads back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CmdOutputs {
    /// Process output lines
    Lines(Vec<String>),
    /// Arbitrary structured result from a custom executor
    Structured(serde_json::Value),
}

impl CmdOutputs {
    /// Fingerprint supplied by the run itself.
    ///
    /// `Some(..)` when the outputs are a mapping with a `fingerprint` key;
    /// the inner value is that key's value (`None` for JSON null). Callers
    /// skip file-based fingerprinting whenever this is `Some`.
    pub fn explicit_fingerprint(&self) -> Option<Option<String>> {
        let Self::Structured(serde_json::Value::Object(map)) = self else {
            return None;
        };
        let value = map.get("fingerprint")?;
        Some(match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    pub fn lines(&self) -> Option<&[String]> {
        match self {
            Self::Lines(lines) => Some(lines.as_slice()),
            Self::Structured(_) => None,
        }
    }
}

impl Default for CmdOutputs {
    fn default() -> Self {
        Self::Lines(Vec::new())
    }
}

/// Persisted record of a step's last run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub succeeded: bool,
    pub fingerprint: Option<String>,
    pub creation_date: DateTime<Utc>,
    /// Source files resolved at run time, relative to the project root
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub cmd_outputs: CmdOutputs,
}

impl Manifest {
    pub fn new(
        succeeded: bool,
        fingerprint: Option<String>,
        files: Vec<PathBuf>,
        cmd_outputs: CmdOutputs,
    ) -> Self {
        Self {
            succeeded,
            fingerprint,
            creation_date: Utc::now(),
            files,
            cmd_outputs,
        }
    }
}

/// Derived status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    /// Never run, or its outputs are gone
    #[serde(rename = "none")]
    None,
    /// Sources changed since the last run, or the last run failed
    #[serde(rename = "outdated")]
    Outdated,
    #[serde(rename = "OK")]
    Ok,
    /// Failure state reported by custom status functions
    #[serde(rename = "KO")]
    Ko,
    #[serde(rename = "running")]
    Running,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Outdated => write!(f, "outdated"),
            Self::Ok => write!(f, "OK"),
            Self::Ko => write!(f, "KO"),
            Self::Running => write!(f, "running"),
        }
    }
}
