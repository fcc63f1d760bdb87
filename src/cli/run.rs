// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Run command - execute one pipeline step

use colored::Colorize;
use miette::Result;

use super::{with_suggestion, Workspace};
use crate::pipeline::{ProjectRegistry, StepKey};
use crate::utils::{create_spinner, print_error, print_info, print_section, print_success};

/// Run a step
pub async fn run(
    project: String,
    flow: String,
    step: String,
    upstream: bool,
    verbose: bool,
) -> Result<()> {
    let workspace = Workspace::current()?;
    let engine = workspace.engine();
    let key = StepKey::new(project, flow, step);

    let spinner = create_spinner(&format!("Running {}", key));
    let result = engine.run_step(key.clone(), upstream).await;
    spinner.finish_and_clear();

    let manifest = match result {
        Ok(manifest) => manifest,
        Err(e) => {
            print_error(&format!("{} failed", key));
            return Err(with_suggestion(e));
        }
    };

    print_success(&format!("{} succeeded", key));
    if let Some(fingerprint) = &manifest.fingerprint {
        println!("  {} {}", "fingerprint".dimmed(), fingerprint.dimmed());
    }

    if verbose {
        if let Some(lines) = manifest.cmd_outputs.lines() {
            print_section("Output");
            for line in lines {
                println!("  {}", line.dimmed());
            }
        }
    }

    let found = workspace.registry.require(&key.project)?;
    let artifacts = found
        .pipeline
        .step(&key.step)
        .map(|s| s.artifacts.as_slice())
        .unwrap_or_default();

    if !artifacts.is_empty() {
        print_section("Artifacts");
        for artifact in artifacts {
            let dir = engine.layout().artifact_dir(&key, &artifact.id);
            print_info(&format!("{} {}", artifact.id.bold(), dir.display()));
            for link in engine.layout().artifact_links(&key, artifact) {
                println!("      {}", link.cyan());
            }
        }
    }

    Ok(())
}
