// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! # stepflow - Local Build Orchestrator
//!
//! `stepflow` runs the build pipelines of a multi-project workspace and
//! only re-runs what changed.
//!
//! ## Features
//!
//! - **Dependency resolution** - Build order, cycle detection and per-project views
//! - **Pipelines** - Steps, flows and artifacts declared per project
//! - **Incremental runs** - Source fingerprints recorded in manifests
//! - **Upstream cascade** - Stale upstream steps run before the requested one
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the workspace build order
//! stepflow order
//!
//! # Show step status for a flow
//! stepflow status api ci
//!
//! # Run a step with its stale upstream steps
//! stepflow run api ci test --upstream
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod pipeline;
pub mod resolver;
pub mod utils;

// Re-export commonly used types
pub use errors::{StepflowError, StepflowResult};
pub use config::WorkspaceConfig;
pub use engine::{StepEngine, StoreLayout};
pub use pipeline::{
    Context, Flow, Manifest, Pipeline, PipelineStep, Project, ProjectRegistry, StepKey, StepStatus,
};
pub use resolver::{resolve_for_project, resolve_workspace, topo_sort, ProjectDag};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
