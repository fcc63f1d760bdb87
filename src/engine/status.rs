// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Step status derivation

use super::{compute_fingerprint, StoreLayout};
use crate::errors::StepflowResult;
use crate::graph::FileSystem;
use crate::pipeline::{Manifest, StatusCall, StepCall, StepKey, StepStatus};

/// Derive a step's status from its last manifest.
///
/// A custom status function replaces everything below. Otherwise:
/// no manifest or a missing artifact folder is `None`, a failed last run is
/// `Outdated`, and a fingerprint comparison decides between `Outdated` and
/// `Ok`. `Running` is never produced here.
pub async fn derive_status(
    fs: &dyn FileSystem,
    layout: &StoreLayout,
    key: &StepKey,
    call: StepCall<'_>,
    manifest: Option<&Manifest>,
) -> StepflowResult<StepStatus> {
    if let Some(status) = &call.step.status {
        return status(StatusCall { call, manifest }).await;
    }

    let Some(manifest) = manifest else {
        return Ok(StepStatus::None);
    };

    for artifact in &call.step.artifacts {
        if !fs.exists(&layout.artifact_dir(key, &artifact.id)).await {
            tracing::debug!(step = %key, artifact = %artifact.id, "artifact folder missing");
            return Ok(StepStatus::None);
        }
    }

    if !manifest.succeeded {
        return Ok(StepStatus::Outdated);
    }

    let current = compute_fingerprint(fs, call).await?;
    if current.checksum == manifest.fingerprint {
        Ok(StepStatus::Ok)
    } else {
        Ok(StepStatus::Outdated)
    }
}
