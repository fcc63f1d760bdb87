// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Manifest command - print a step's last recorded run

use miette::Result;

use super::{with_suggestion, Workspace};
use crate::pipeline::StepKey;

/// Run the manifest command
pub async fn run(project: String, flow: String, step: String) -> Result<()> {
    let workspace = Workspace::current()?;
    let engine = workspace.engine();
    let key = StepKey::new(project, flow, step);

    let Some(manifest) = engine.read_manifest(&key).await.map_err(with_suggestion)? else {
        return Err(miette::miette!("No manifest recorded for {}", key));
    };

    let out = serde_json::to_string_pretty(&manifest)
        .map_err(|e| miette::miette!("Failed to serialize manifest: {}", e))?;
    println!("{}", out);
    Ok(())
}
