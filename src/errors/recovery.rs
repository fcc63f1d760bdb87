// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use super::StepflowError;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Pick a suggestion for an error, if one applies
    pub fn for_error(error: &StepflowError) -> Option<Self> {
        match error {
            StepflowError::CyclicDependency { .. } => {
                let cycle = error.cycle().unwrap_or_default();
                Some(Self::fix_cyclic_dependency(cycle))
            }
            StepflowError::ProjectNotFound { name } => Some(Self::find_project(name)),
            StepflowError::CommandFailure {
                command, outputs, ..
            } => Some(Self::inspect_command_failure(command, outputs)),
            StepflowError::StepAlreadyRunning { key } => Some(Self {
                action: "Wait for the running step".into(),
                steps: vec![format!("'{}' is still executing", key)],
                commands: vec!["stepflow status <project> <flow>".into()],
            }),
            _ => None,
        }
    }

    /// Suggest fixing a cyclic dependency
    pub fn fix_cyclic_dependency(cycle: &[String]) -> Self {
        Self {
            action: "Remove cyclic dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", cycle.join(" → ")),
                "Drop one of the dependency names in the descriptors above".into(),
                "Projects must form a directed acyclic graph (DAG)".into(),
            ],
            commands: vec![
                "# Visualize the workspace graph:".into(),
                "stepflow graph --format mermaid".into(),
            ],
        }
    }

    /// Suggest locating a project that the registry does not know
    pub fn find_project(name: &str) -> Self {
        Self {
            action: format!("Locate project '{}'", name),
            steps: vec![
                "Projects are discovered from stepflow.yaml descriptors".into(),
                "Check the `name` field and that the descriptor is not ignored".into(),
            ],
            commands: vec!["stepflow order".into()],
        }
    }

    /// Point at the tail of a failed command's output
    pub fn inspect_command_failure(command: &str, outputs: &[String]) -> Self {
        let tail = outputs.len().saturating_sub(5);
        let mut steps = vec![format!("Command: {}", command)];
        steps.extend(outputs[tail..].iter().map(|line| format!("  | {}", line)));

        Self {
            action: "Fix the failing command and re-run the step".into(),
            steps,
            commands: vec!["stepflow manifest <project> <flow> <step>".into()],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_suggestion_names_members() {
        let err = StepflowError::CyclicDependency {
            chain: vec!["p4".into(), "p5".into(), "p4".into()],
        };
        let suggestion = RecoverySuggestion::for_error(&err).unwrap();
        assert!(suggestion.steps[0].contains("p4 → p5 → p4"));
    }

    #[test]
    fn test_command_failure_shows_tail() {
        let outputs: Vec<String> = (0..8).map(|i| format!("line {}", i)).collect();
        let suggestion = RecoverySuggestion::inspect_command_failure("make", &outputs);
        assert_eq!(suggestion.steps.len(), 6);
        assert!(suggestion.steps.last().unwrap().contains("line 7"));
    }

    #[test]
    fn test_no_suggestion_for_io() {
        let err = StepflowError::Io {
            message: "denied".into(),
        };
        assert!(RecoverySuggestion::for_error(&err).is_none());
    }
}
