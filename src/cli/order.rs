// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Order command - print the workspace build order

use colored::Colorize;
use miette::Result;

use super::{with_suggestion, Workspace};
use crate::resolver::resolve_workspace;

/// Run the order command
pub async fn run(verbose: bool) -> Result<()> {
    let workspace = Workspace::current()?;
    let resolution = resolve_workspace(workspace.registry.as_ref()).map_err(with_suggestion)?;

    if resolution.sorted_projects.is_empty() {
        println!("{}", "No projects found".yellow());
        return Ok(());
    }

    for (i, project) in resolution.sorted_projects.iter().enumerate() {
        let mut line = format!("{}. {} {}", i + 1, project.name.bold(), project.version.dimmed());

        if verbose {
            let deps = resolution
                .recursive_deps
                .get(&project.name)
                .map(|deps| deps.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            if !deps.is_empty() {
                line.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }
        }

        println!("{}", line);
    }

    Ok(())
}
