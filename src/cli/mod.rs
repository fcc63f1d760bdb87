// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! CLI command definitions and handlers
//!
//! A thin front-end over the library: every command discovers the
//! workspace from the current directory, then calls the resolver or the
//! engine.

pub mod graph;
pub mod manifest;
pub mod order;
pub mod run;
pub mod status;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::WorkspaceConfig;
use crate::engine::StepEngine;
use crate::errors::RecoverySuggestion;
use crate::pipeline::{discover, InMemoryRegistry};
use crate::StepflowError;

/// Local build orchestrator
#[derive(Parser, Debug)]
#[clap(
    name = "stepflow",
    version,
    about = "Local build orchestrator with incremental pipeline steps",
    long_about = None,
    after_help = "Examples:\n\
        stepflow order                        Show the workspace build order\n\
        stepflow graph --project api          Show what api depends on and what depends on it\n\
        stepflow status api ci                Show step status for a flow\n\
        stepflow run api ci test --upstream   Run a step after its stale upstream steps\n\n\
        See 'stepflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the project dependency graph
    Graph {
        /// Centre the graph on one project
        #[clap(short, long)]
        project: Option<String>,

        /// With --project, show only direct links to the project
        #[clap(long, requires = "project")]
        simple: bool,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Print projects in build order
    Order,

    /// Show step status
    Status {
        /// Project name
        project: String,

        /// Flow name (default: every flow)
        flow: Option<String>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Run a pipeline step
    Run {
        project: String,
        flow: String,
        step: String,

        /// Run stale upstream steps first
        #[clap(short, long)]
        upstream: bool,
    },

    /// Print the last manifest of a step
    Manifest {
        project: String,
        flow: String,
        step: String,
    },
}

/// Output format for status
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// A discovered workspace
pub struct Workspace {
    pub root: PathBuf,
    pub config: WorkspaceConfig,
    pub registry: Arc<InMemoryRegistry>,
}

impl Workspace {
    /// Load config and discover every project under `root`
    pub fn load(root: &Path) -> Result<Self> {
        let config = WorkspaceConfig::load(root)?;
        let projects = discover(root, &config.discovery)?;
        tracing::debug!(projects = projects.len(), root = %root.display(), "workspace loaded");

        Ok(Self {
            root: root.to_path_buf(),
            config,
            registry: Arc::new(InMemoryRegistry::from_projects(projects)),
        })
    }

    /// Load the workspace at the current directory
    pub fn current() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
        Self::load(&cwd)
    }

    pub fn engine(&self) -> StepEngine {
        StepEngine::from_config(self.registry.clone(), &self.root, &self.config)
    }
}

/// Print a recovery hint for an error and hand it back for reporting
pub(crate) fn with_suggestion(error: StepflowError) -> miette::Report {
    if let Some(suggestion) = RecoverySuggestion::for_error(&error) {
        eprintln!();
        eprintln!("{}", suggestion);
    }
    error.into()
}
