// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Source fingerprinting

use std::path::PathBuf;

use crate::errors::StepflowResult;
use crate::graph::FileSystem;
use crate::pipeline::{SourceSet, Sources, StepCall};

/// Checksum over a step's resolved sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    /// `None` when the step declares no sources
    pub checksum: Option<String>,

    /// Resolved files, relative to the project root
    pub files: Vec<PathBuf>,
}

/// Resolve a step's sources and checksum them.
///
/// A sources callable may return either globs, resolved against the project
/// root, or an explicit file list used as-is.
pub async fn compute_fingerprint(
    fs: &dyn FileSystem,
    call: StepCall<'_>,
) -> StepflowResult<Fingerprint> {
    let Some(sources) = &call.step.sources else {
        return Ok(Fingerprint::default());
    };

    let root = call.project.root();
    let files = match sources {
        Sources::Listing(listing) => fs.list(root, listing).await?,
        Sources::Callable(resolve) => match resolve(call).await? {
            SourceSet::Listing(listing) => fs.list(root, &listing).await?,
            SourceSet::Files(files) => files,
        },
    };

    let checksum = fs.checksum(root, &files).await?;
    tracing::debug!(step = %call.step.id, files = files.len(), checksum = %checksum, "fingerprint");

    Ok(Fingerprint {
        checksum: Some(checksum),
        files,
    })
}
