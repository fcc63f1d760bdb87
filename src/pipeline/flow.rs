// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Flows and flow navigation
//!
//! A flow is written as a list of linear branches, `"setup > build > test"`.
//! Branches sharing a step id express merge points. The branch strings are
//! parsed once into successor/predecessor maps; all queries run on those.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{Pipeline, PipelineStep};

/// Separator between step ids in a branch
pub const BRANCH_SEPARATOR: char = '>';

/// A named DAG over a pipeline's step ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    /// Flow name (unique within pipeline)
    pub name: String,

    /// Branch strings as written
    pub dag: Vec<String>,

    branches: Vec<Vec<String>>,
    successors: BTreeMap<String, BTreeSet<String>>,
    predecessors: BTreeMap<String, BTreeSet<String>>,
}

impl Flow {
    /// Parse a flow from its branch strings
    pub fn new<I, S>(name: impl Into<String>, dag: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dag: Vec<String> = dag.into_iter().map(Into::into).collect();
        let branches: Vec<Vec<String>> = dag.iter().map(|b| parse_branch(b)).collect();

        let mut successors: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut predecessors: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for branch in &branches {
            for pair in branch.windows(2) {
                successors
                    .entry(pair[0].clone())
                    .or_default()
                    .insert(pair[1].clone());
                predecessors
                    .entry(pair[1].clone())
                    .or_default()
                    .insert(pair[0].clone());
            }
        }

        Self {
            name: name.into(),
            dag,
            branches,
            successors,
            predecessors,
        }
    }

    /// Parsed branches, tokens trimmed, empty tokens dropped
    pub fn branches(&self) -> &[Vec<String>] {
        &self.branches
    }

    /// Every step id mentioned by any branch
    pub fn step_ids(&self) -> BTreeSet<&str> {
        self.branches
            .iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Immediate successor edges, as `(from, to)` pairs
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.successors
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.as_str(), to.as_str())))
            .collect()
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.branches.iter().any(|b| b.iter().any(|t| t == step_id))
    }

    /// Ids of every step after `step_id` in any branch containing it,
    /// followed transitively through the other branches those steps appear in
    pub fn downstream_ids(&self, step_id: &str, include_self: bool) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([step_id.to_string()]);

        while let Some(current) = queue.pop_front() {
            let Some(next) = self.successors.get(&current) else {
                continue;
            };
            for id in next {
                if found.insert(id.clone()) {
                    queue.push_back(id.clone());
                }
            }
        }

        if include_self {
            found.insert(step_id.to_string());
        }
        found
    }

    /// Ids of the steps immediately preceding `step_id` in any branch
    pub fn direct_upstream_ids(&self, step_id: &str) -> BTreeSet<String> {
        self.predecessors.get(step_id).cloned().unwrap_or_default()
    }
}

fn parse_branch(branch: &str) -> Vec<String> {
    branch
        .split(BRANCH_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Flow queries resolved to pipeline steps.
///
/// Results come back in pipeline step order, not flow order.
#[derive(Debug, Clone, Copy)]
pub struct FlowNavigator<'a> {
    pipeline: &'a Pipeline,
    flow: &'a Flow,
}

impl<'a> FlowNavigator<'a> {
    pub fn new(pipeline: &'a Pipeline, flow: &'a Flow) -> Self {
        Self { pipeline, flow }
    }

    fn select(&self, ids: &BTreeSet<String>) -> Vec<&'a PipelineStep> {
        self.pipeline
            .steps
            .iter()
            .filter(|s| ids.contains(&s.id))
            .collect()
    }

    /// Steps mentioned by the flow
    pub fn steps_in_flow(&self) -> Vec<&'a PipelineStep> {
        let ids: BTreeSet<String> = self.flow.step_ids().into_iter().map(String::from).collect();
        self.select(&ids)
    }

    /// Steps downstream of `step_id`
    pub fn downstream_of(&self, step_id: &str, include_self: bool) -> Vec<&'a PipelineStep> {
        self.select(&self.flow.downstream_ids(step_id, include_self))
    }

    /// Steps immediately upstream of `step_id`
    pub fn direct_upstream_of(&self, step_id: &str) -> Vec<&'a PipelineStep> {
        self.select(&self.flow.direct_upstream_ids(step_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(steps: Vec<&PipelineStep>) -> Vec<&str> {
        steps.into_iter().map(|s| s.id.as_str()).collect()
    }

    fn diamond() -> Pipeline {
        Pipeline::new(
            ["compile", "test", "lint", "package"]
                .into_iter()
                .map(PipelineStep::new)
                .collect(),
            vec![Flow::new(
                "ci",
                ["compile > test > package", "compile > lint > package"],
            )],
        )
    }

    #[test]
    fn test_parse_trims_tokens() {
        let flow = Flow::new("f", ["  a>b >  c ", "d"]);
        assert_eq!(
            flow.branches(),
            &[
                vec!["a".to_string(), "b".into(), "c".into()],
                vec!["d".to_string()]
            ]
        );
        assert_eq!(flow.edges(), vec![("a", "b"), ("b", "c")]);
    }

    #[test]
    fn test_steps_in_flow_follow_pipeline_order() {
        let pipeline = diamond();
        let flow = pipeline.flow("ci").unwrap();
        let nav = pipeline.navigator(flow);
        assert_eq!(
            ids(nav.steps_in_flow()),
            vec!["compile", "test", "lint", "package"]
        );
    }

    #[test]
    fn test_downstream_of_merges_branches() {
        let pipeline = diamond();
        let flow = pipeline.flow("ci").unwrap();
        let nav = pipeline.navigator(flow);

        assert_eq!(
            ids(nav.downstream_of("compile", false)),
            vec!["test", "lint", "package"]
        );
        assert_eq!(ids(nav.downstream_of("lint", true)), vec!["lint", "package"]);
        assert!(nav.downstream_of("package", false).is_empty());
    }

    #[test]
    fn test_downstream_crosses_branch_continuations() {
        // "b" continues differently in the second branch
        let flow = Flow::new("f", ["a > b > c", "b > d", "d > e"]);
        let found: Vec<String> = flow.downstream_ids("a", false).into_iter().collect();
        assert_eq!(found, vec!["b", "c", "d", "e"]);
    }

    #[test]
    fn test_direct_upstream() {
        let pipeline = diamond();
        let flow = pipeline.flow("ci").unwrap();
        let nav = pipeline.navigator(flow);

        assert_eq!(ids(nav.direct_upstream_of("package")), vec!["test", "lint"]);
        assert!(nav.direct_upstream_of("compile").is_empty());
    }
}
