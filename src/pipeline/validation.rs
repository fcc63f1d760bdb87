// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Pipeline validation
//!
//! Checks the structural invariants of a pipeline before a project is built
//! from it: unique step ids, flows that only mention known steps, and flows
//! that really are acyclic.

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use std::collections::HashSet;

use crate::pipeline::{Pipeline, PipelineStep, Run};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline
    pub fn validate(pipeline: &Pipeline) -> ValidationResult {
        let mut result = ValidationResult::new();

        // Check for duplicate step ids
        let mut seen_steps = HashSet::new();
        for step in &pipeline.steps {
            if !seen_steps.insert(step.id.as_str()) {
                result.add_error(&format!("Duplicate step id: '{}'", step.id));
            }
        }

        // Check for duplicate flow names
        let mut seen_flows = HashSet::new();
        for flow in &pipeline.flows {
            if !seen_flows.insert(flow.name.as_str()) {
                result.add_error(&format!("Duplicate flow name: '{}'", flow.name));
            }
        }

        // Validate flow tokens and shape
        let mut in_any_flow = HashSet::new();
        for flow in &pipeline.flows {
            for id in flow.step_ids() {
                in_any_flow.insert(id);
                if !seen_steps.contains(id) {
                    result.add_error(&format!(
                        "Flow '{}' references unknown step '{}'",
                        flow.name, id
                    ));
                }
            }

            let graph: DiGraphMap<&str, ()> = DiGraphMap::from_edges(flow.edges());
            if is_cyclic_directed(&graph) {
                result.add_error(&format!("Flow '{}' contains a cycle", flow.name));
            }
        }

        // Validate each step
        for step in &pipeline.steps {
            Self::validate_step(step, &mut result);

            if !pipeline.flows.is_empty() && !in_any_flow.contains(step.id.as_str()) {
                result.add_warning(&format!(
                    "Step '{}' is not part of any flow and can never run",
                    step.id
                ));
            }
        }

        result
    }

    /// Validate a single step
    fn validate_step(step: &PipelineStep, result: &mut ValidationResult) {
        if step.id.trim().is_empty() {
            result.add_error("Step id is empty");
        }

        if let Run::Command(template) = &step.run {
            if template.trim().is_empty() {
                result.add_error(&format!("Step '{}': command is empty", step.id));
            }
        }

        let mut seen_artifacts = HashSet::new();
        for artifact in &step.artifacts {
            if !seen_artifacts.insert(artifact.id.as_str()) {
                result.add_error(&format!(
                    "Step '{}': duplicate artifact id '{}'",
                    step.id, artifact.id
                ));
            }
            if artifact.files.is_empty() {
                result.add_error(&format!(
                    "Step '{}': artifact '{}' has no include patterns",
                    step.id, artifact.id
                ));
            }
        }

        if step.sources.is_none() && !step.artifacts.is_empty() {
            result.add_warning(&format!(
                "Step '{}' declares artifacts but no sources; it will never be reported outdated",
                step.id
            ));
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FileListing;
    use crate::pipeline::{Artifact, Flow};

    fn steps(ids: &[&str]) -> Vec<PipelineStep> {
        ids.iter().map(|id| PipelineStep::new(*id).with_command("true")).collect()
    }

    #[test]
    fn test_valid_pipeline() {
        let pipeline = Pipeline::new(
            steps(&["compile", "test"]),
            vec![Flow::new("ci", ["compile > test"])],
        );
        let result = PipelineValidator::validate(&pipeline);
        assert!(result.is_valid());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_duplicate_step_ids() {
        let pipeline = Pipeline::new(steps(&["dup", "dup"]), vec![]);
        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("Duplicate step id"));
    }

    #[test]
    fn test_unknown_flow_token() {
        let pipeline = Pipeline::new(steps(&["a"]), vec![Flow::new("ci", ["a > ghost"])]);
        let result = PipelineValidator::validate(&pipeline);
        assert!(result.errors.iter().any(|e| e.contains("unknown step 'ghost'")));
    }

    #[test]
    fn test_flow_cycle_rejected() {
        let pipeline = Pipeline::new(
            steps(&["a", "b"]),
            vec![Flow::new("loop", ["a > b", "b > a"])],
        );
        let result = PipelineValidator::validate(&pipeline);
        assert!(result.errors.iter().any(|e| e.contains("cycle")));
    }

    #[test]
    fn test_step_outside_flows_warns() {
        let pipeline = Pipeline::new(steps(&["a", "orphan"]), vec![Flow::new("ci", ["a"])]);
        let result = PipelineValidator::validate(&pipeline);
        assert!(result.is_valid());
        assert!(result.warnings[0].contains("orphan"));
    }

    #[test]
    fn test_duplicate_artifact_ids() {
        let step = PipelineStep::new("build")
            .with_command("make")
            .with_sources(FileListing::new(["src/**"]))
            .with_artifact(Artifact::new("bin", FileListing::new(["out/*"])))
            .with_artifact(Artifact::new("bin", FileListing::new(["out/*"])));
        let pipeline = Pipeline::new(vec![step], vec![]);
        let result = PipelineValidator::validate(&pipeline);
        assert!(result.errors.iter().any(|e| e.contains("duplicate artifact")));
    }
}
