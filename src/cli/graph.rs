// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Graph command - visualize the project dependency graph

use colored::Colorize;
use miette::Result;

use super::{with_suggestion, GraphFormat, Workspace};
use crate::resolver::{resolve_for_project, resolve_workspace, ProjectDag};

/// Run the graph command
pub async fn run(
    project: Option<String>,
    simple: bool,
    format: GraphFormat,
    verbose: bool,
) -> Result<()> {
    let workspace = Workspace::current()?;
    let registry = workspace.registry.as_ref();

    let dag = match project {
        Some(name) => {
            let resolution = resolve_for_project(&name, registry).map_err(with_suggestion)?;

            if verbose {
                let below: Vec<&str> = resolution.below.iter().map(|p| p.name.as_str()).collect();
                let above: Vec<&str> = resolution.above.iter().map(|p| p.name.as_str()).collect();
                eprintln!("{} {}", "below:".dimmed(), below.join(", "));
                eprintln!("{} {}", "above:".dimmed(), above.join(", "));
            }

            if simple {
                resolution.simple_dag
            } else {
                resolution.dag
            }
        }
        None => resolve_workspace(registry).map_err(with_suggestion)?.global_dag,
    };

    println!("{}", render(&dag, format)?);
    Ok(())
}

fn render(dag: &ProjectDag, format: GraphFormat) -> Result<String> {
    Ok(match format {
        GraphFormat::Text => dag.to_text()?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    })
}
