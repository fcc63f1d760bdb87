// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Error types
//!
//! Graph errors (unknown identifiers, cycles) are reported before anything
//! runs. Execution errors are recorded in a manifest before they reach the
//! caller. I/O errors from the filesystem and process collaborators pass
//! through unchanged.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for stepflow operations
pub type StepflowResult<T> = Result<T, StepflowError>;

/// Main error type for stepflow
#[derive(Error, Debug, Diagnostic)]
pub enum StepflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Graph Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Project '{name}' not found in the workspace")]
    #[diagnostic(
        code(stepflow::project_not_found),
        help("Check the project descriptor name, or re-run discovery")
    )]
    ProjectNotFound { name: String },

    #[error("Flow '{flow}' not found in project '{project}'")]
    #[diagnostic(code(stepflow::flow_not_found))]
    FlowNotFound { project: String, flow: String },

    #[error("Step '{step}' not found in project '{project}'")]
    #[diagnostic(code(stepflow::step_not_found))]
    StepNotFound { project: String, step: String },

    #[error("Cyclic dependency detected: {}", .chain.join(" -> "))]
    #[diagnostic(
        code(stepflow::cyclic_dependency),
        help("Review the project dependencies to remove the cycle")
    )]
    CyclicDependency { chain: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid pipeline for project '{project}': {reason}")]
    #[diagnostic(code(stepflow::invalid_pipeline))]
    InvalidPipeline { project: String, reason: String },

    #[error("Step '{step}' has no run action")]
    #[diagnostic(
        code(stepflow::no_run_defined),
        help("Give the step a command, a callable, or a custom executor")
    )]
    NoRunDefined { step: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Command '{command}' exited with code {exit_code}")]
    #[diagnostic(code(stepflow::command_failure))]
    CommandFailure {
        command: String,
        exit_code: i32,
        outputs: Vec<String>,
    },

    #[error("Step '{key}' is already running")]
    #[diagnostic(
        code(stepflow::step_already_running),
        help("Wait for the current run to finish before triggering it again")
    )]
    StepAlreadyRunning { key: String },

    #[error("{message}")]
    #[diagnostic(code(stepflow::user_code))]
    UserCode { message: String },

    #[error("Background run failed: {message}")]
    #[diagnostic(code(stepflow::join_error))]
    Join { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(stepflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(stepflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(stepflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(stepflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(stepflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(stepflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(stepflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for StepflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for StepflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for StepflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for StepflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for StepflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl From<tokio::task::JoinError> for StepflowError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Join { message: e.to_string() }
    }
}

impl StepflowError {
    /// Wrap an error raised by user code (callable run, sources or status)
    pub fn user(message: impl Into<String>) -> Self {
        Self::UserCode {
            message: message.into(),
        }
    }

    /// The closed loop of a cyclic dependency chain.
    ///
    /// The reported chain starts at the project the check began from, which
    /// may sit outside the loop; this returns the suffix that starts and ends
    /// at the offending project.
    pub fn cycle(&self) -> Option<&[String]> {
        let Self::CyclicDependency { chain } = self else {
            return None;
        };
        let last = chain.last()?;
        let start = chain.iter().position(|name| name == last)?;
        Some(&chain[start..])
    }

    /// Whether this error comes from the graph (bad identifiers or cycles)
    /// rather than from running a step
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound { .. }
                | Self::FlowNotFound { .. }
                | Self::StepNotFound { .. }
                | Self::CyclicDependency { .. }
        )
    }

    /// Output lines to record in a manifest for a failed run
    pub fn captured_outputs(&self) -> Vec<String> {
        match self {
            Self::CommandFailure { outputs, .. } => {
                let mut lines = outputs.clone();
                lines.push(self.to_string());
                lines
            }
            other => vec![other.to_string()],
        }
    }
}
