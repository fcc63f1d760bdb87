// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Pipeline data model
//!
//! Projects, their pipelines of steps, the flows over those steps, and the
//! manifests recording each step's last run.

mod definition;
mod descriptor;
mod flow;
mod manifest;
mod project;
mod validation;

pub use definition::*;
pub use descriptor::{discover, FlowDescriptor, ProjectDescriptor, StepDescriptor};
pub use flow::{Flow, FlowNavigator, BRANCH_SEPARATOR};
pub use manifest::{CmdOutputs, Manifest, StepKey, StepStatus};
pub use project::{InMemoryRegistry, Project, ProjectRegistry, VARIANT_SEPARATOR};
pub use validation::{PipelineValidator, ValidationResult};
