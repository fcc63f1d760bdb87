// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Project DAG view
//!
//! Edges point from a dependency to its dependent, so walking outgoing
//! edges climbs towards the projects that need rebuilding after a change.

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, HashSet};

use crate::errors::{StepflowError, StepflowResult};

/// Directed graph over project names
#[derive(Debug, Clone, Default)]
pub struct ProjectDag {
    graph: DiGraph<String, ()>,
    name_to_index: IndexMap<String, NodeIndex>,
}

impl ProjectDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning the existing one if already present
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(index) = self.name_to_index.get(name) {
            return *index;
        }
        let index = self.graph.add_node(name.to_string());
        self.name_to_index.insert(name.to_string(), index);
        index
    }

    /// Add an edge `from -> to`, adding missing nodes. Duplicate edges are ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.name_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_index.is_empty()
    }

    /// Node names in insertion order
    pub fn nodes(&self) -> Vec<&str> {
        self.name_to_index.keys().map(String::as_str).collect()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| {
                (
                    self.graph[e.source()].as_str(),
                    self.graph[e.target()].as_str(),
                )
            })
            .collect()
    }

    /// Direct successors of a node, sorted by name
    pub fn children(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Direct predecessors of a node, sorted by name
    pub fn parents(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(node) = self.name_to_index.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(*node, direction)
            .map(|n| self.graph[n].as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Adjacency map: every node mapped to its sorted children
    pub fn adjacency(&self) -> BTreeMap<String, Vec<String>> {
        self.name_to_index
            .keys()
            .map(|name| {
                let children = self.children(name).into_iter().map(String::from).collect();
                (name.clone(), children)
            })
            .collect()
    }

    /// Subgraph induced by `keep`, preserving node and edge order
    pub fn restrict(&self, keep: &HashSet<String>) -> Self {
        let mut dag = Self::new();
        for name in self.name_to_index.keys().filter(|n| keep.contains(*n)) {
            dag.add_node(name);
        }
        for (from, to) in self.edges() {
            if keep.contains(from) && keep.contains(to) {
                dag.add_edge(from, to);
            }
        }
        dag
    }

    /// Node names in dependency order
    pub fn topological_order(&self) -> StepflowResult<Vec<String>> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n].clone()).collect())
            .map_err(|cycle| StepflowError::CyclicDependency {
                chain: self.find_cycle(cycle.node_id()),
            })
    }

    /// Walk successors from a node known to sit on a cycle until one repeats
    fn find_cycle(&self, start: NodeIndex) -> Vec<String> {
        let sccs = petgraph::algo::kosaraju_scc(&self.graph);
        let component: HashSet<NodeIndex> = sccs
            .into_iter()
            .find(|c| c.contains(&start))
            .unwrap_or_default()
            .into_iter()
            .collect();

        let mut path = vec![start];
        let mut current = start;
        loop {
            let next = self
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .find(|n| component.contains(n));
            let Some(next) = next else {
                break;
            };
            if let Some(pos) = path.iter().position(|n| *n == next) {
                path.push(next);
                path.drain(..pos);
                break;
            }
            path.push(next);
            current = next;
        }

        path.into_iter().map(|n| self.graph[n].clone()).collect()
    }

    /// Generate a Mermaid diagram
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for (name, node) in &self.name_to_index {
            out.push_str(&format!("    n{}[\"{}\"]\n", node.index(), name));
        }

        for edge in self.graph.raw_edges() {
            out.push_str(&format!(
                "    n{} --> n{}\n",
                edge.source().index(),
                edge.target().index()
            ));
        }

        out
    }

    /// Generate a DOT diagram
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph projects {\n");
        out.push_str("    rankdir=BT;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        // Isolated nodes
        for (name, node) in &self.name_to_index {
            if self.graph.neighbors_undirected(*node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Text listing in dependency order
    pub fn to_text(&self) -> StepflowResult<String> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, name) in order.iter().enumerate() {
            out.push_str(&format!("{}. {}", i + 1, name));

            let deps = self.parents(name);
            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ProjectDag {
        let mut dag = ProjectDag::new();
        dag.add_edge("core", "api");
        dag.add_edge("api", "web");
        dag.add_node("docs");
        dag
    }

    #[test]
    fn test_nodes_and_edges_keep_insertion_order() {
        let dag = chain();
        assert_eq!(dag.nodes(), vec!["core", "api", "web", "docs"]);
        assert_eq!(dag.edges(), vec![("core", "api"), ("api", "web")]);
    }

    #[test]
    fn test_duplicate_edges_ignored() {
        let mut dag = chain();
        dag.add_edge("core", "api");
        assert_eq!(dag.edges().len(), 2);
        assert_eq!(dag.len(), 4);
    }

    #[test]
    fn test_adjacency() {
        let adjacency = chain().adjacency();
        assert_eq!(adjacency["core"], vec!["api"]);
        assert!(adjacency["docs"].is_empty());
        assert!(adjacency["web"].is_empty());
    }

    #[test]
    fn test_restrict_drops_outside_edges() {
        let keep: HashSet<String> = ["api", "web"].iter().map(|s| s.to_string()).collect();
        let dag = chain().restrict(&keep);
        assert_eq!(dag.nodes(), vec!["api", "web"]);
        assert_eq!(dag.edges(), vec![("api", "web")]);
    }

    #[test]
    fn test_topological_order_and_cycle() {
        let order = chain().topological_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("core") < pos("api"));
        assert!(pos("api") < pos("web"));

        let mut cyclic = chain();
        cyclic.add_edge("web", "core");
        let err = cyclic.topological_order().unwrap_err();
        let cycle = err.cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn test_renderers() {
        let dag = chain();

        let mermaid = dag.to_mermaid();
        assert!(mermaid.starts_with("graph TD"));
        assert!(mermaid.contains("n0[\"core\"]"));
        assert!(mermaid.contains("n0 --> n1"));

        let dot = dag.to_dot();
        assert!(dot.contains("\"core\" -> \"api\";"));
        assert!(dot.contains("    \"docs\";"));

        let text = dag.to_text().unwrap();
        assert!(text.contains("api [depends: core]"));
    }
}
