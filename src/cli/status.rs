// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Status command - show step status per flow

use colored::Colorize;
use miette::Result;
use std::collections::BTreeMap;

use super::{with_suggestion, OutputFormat, Workspace};
use crate::pipeline::{ProjectRegistry, StepStatus};
use crate::utils::status_label;

/// Run the status command
pub async fn run(project: String, flow: Option<String>, format: OutputFormat) -> Result<()> {
    let workspace = Workspace::current()?;
    let engine = workspace.engine();
    let found = workspace.registry.require(&project).map_err(with_suggestion)?;

    let flows: Vec<String> = match flow {
        Some(flow) => vec![flow],
        None => found.pipeline.flows.iter().map(|f| f.name.clone()).collect(),
    };

    let mut report: BTreeMap<String, Vec<(String, StepStatus)>> = BTreeMap::new();
    for flow in &flows {
        let statuses = engine
            .flow_status(&project, flow)
            .await
            .map_err(with_suggestion)?;
        report.insert(flow.clone(), statuses);
    }

    match format {
        OutputFormat::Json => {
            let json: BTreeMap<&str, BTreeMap<&str, StepStatus>> = report
                .iter()
                .map(|(flow, steps)| {
                    let steps = steps.iter().map(|(id, s)| (id.as_str(), *s)).collect();
                    (flow.as_str(), steps)
                })
                .collect();
            let out = serde_json::to_string_pretty(&json)
                .map_err(|e| miette::miette!("Failed to serialize status: {}", e))?;
            println!("{}", out);
        }
        OutputFormat::Text => {
            println!("{} {}", project.bold(), found.version.dimmed());
            for flow in &flows {
                println!();
                println!("{}:", flow.bold());
                for (step, status) in report.get(flow).into_iter().flatten() {
                    println!("  {:<24} {}", step, status_label(*status));
                }
            }
        }
    }

    Ok(())
}
