// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Dependency resolver
//!
//! Orders projects by their declared dependencies, detects cycles, and
//! builds DAG views of the workspace.

mod dag;
mod resolve;

pub use dag::ProjectDag;
pub use resolve::{
    check_cyclic_dependency, direct_dependencies, recursive_dependencies, resolve_for_project,
    resolve_workspace, topo_sort, ProjectResolution, WorkspaceResolution,
};
