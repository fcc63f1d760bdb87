// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Dependency resolution between projects
//!
//! Dependencies are declared by name and resolved against a registry
//! snapshot. Names missing from the snapshot are dropped at lookup time.

use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::ProjectDag;
use crate::errors::{StepflowError, StepflowResult};
use crate::pipeline::{Context, Project, ProjectRegistry};

/// Direct dependencies of `project` found in `projects`, minus `ignore`.
///
/// Returned in registry order.
pub fn direct_dependencies(
    project: &Project,
    projects: &[Arc<Project>],
    ignore: &HashSet<String>,
) -> Vec<Arc<Project>> {
    let names = project
        .pipeline
        .dependencies
        .names(project, &Context::default());

    for missing in names
        .iter()
        .filter(|n| !projects.iter().any(|p| &p.name == *n))
    {
        tracing::debug!(project = %project.name, dependency = %missing, "dependency not in registry");
    }

    projects
        .iter()
        .filter(|p| names.contains(&p.name) && !ignore.contains(&p.name))
        .cloned()
        .collect()
}

/// Transitive dependencies of `project`.
///
/// Every visited name is added to `ignore`, which bounds the walk but also
/// means a cycle silently truncates the result. Use
/// [`check_cyclic_dependency`] to detect cycles.
pub fn recursive_dependencies(
    project: &Project,
    projects: &[Arc<Project>],
    ignore: &mut HashSet<String>,
) -> Vec<Arc<Project>> {
    ignore.insert(project.name.clone());

    let direct = direct_dependencies(project, projects, ignore);
    for dep in &direct {
        ignore.insert(dep.name.clone());
    }

    let mut all = direct.clone();
    for dep in &direct {
        all.extend(recursive_dependencies(dep, projects, ignore));
    }
    all
}

/// Fail with `CyclicDependency` if a cycle is reachable from `name`.
///
/// `forbidden` is the resolution path leading to `name`. The reported chain
/// is that path, then `name`, then the dependency that closed the loop.
pub fn check_cyclic_dependency(
    name: &str,
    projects: &[Arc<Project>],
    forbidden: &[String],
) -> StepflowResult<()> {
    let mut path = forbidden.to_vec();
    check_from(name, projects, &mut path, &mut HashSet::new())
}

/// Depth-first walk. `cleared` holds names already proven to reach no cycle.
fn check_from(
    name: &str,
    projects: &[Arc<Project>],
    path: &mut Vec<String>,
    cleared: &mut HashSet<String>,
) -> StepflowResult<()> {
    if cleared.contains(name) {
        return Ok(());
    }

    let project = find(projects, name)?;
    path.push(name.to_string());

    for dep in direct_dependencies(project, projects, &HashSet::new()) {
        if path.contains(&dep.name) {
            let mut chain = path.clone();
            chain.push(dep.name.clone());
            return Err(StepflowError::CyclicDependency { chain });
        }
        check_from(&dep.name, projects, path, cleared)?;
    }

    path.pop();
    cleared.insert(name.to_string());
    Ok(())
}

fn find<'a>(projects: &'a [Arc<Project>], name: &str) -> StepflowResult<&'a Project> {
    projects
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.as_ref())
        .ok_or_else(|| StepflowError::ProjectNotFound {
            name: name.to_string(),
        })
}

/// Order `projects` so every project follows its dependencies.
///
/// Each round places every project whose dependencies (within `projects`)
/// are already placed, keeping input order among them. A round that places
/// nothing proves a cycle; only then is the cycle check run to name it.
pub fn topo_sort(projects: &[Arc<Project>]) -> StepflowResult<Vec<Arc<Project>>> {
    let deps: Vec<Vec<String>> = projects
        .iter()
        .map(|p| {
            direct_dependencies(p, projects, &HashSet::new())
                .into_iter()
                .map(|d| d.name.clone())
                .collect()
        })
        .collect();

    let mut placed: HashSet<String> = HashSet::new();
    let mut sorted = Vec::with_capacity(projects.len());
    let mut remaining: Vec<usize> = (0..projects.len()).collect();

    while !remaining.is_empty() {
        let (ready, waiting): (Vec<usize>, Vec<usize>) = remaining
            .iter()
            .partition(|&&i| deps[i].iter().all(|d| placed.contains(d)));

        if ready.is_empty() {
            let mut cleared = HashSet::new();
            for &i in &waiting {
                check_from(&projects[i].name, projects, &mut Vec::new(), &mut cleared)?;
            }
            return Err(StepflowError::CyclicDependency {
                chain: waiting.iter().map(|&i| projects[i].name.clone()).collect(),
            });
        }

        for &i in &ready {
            placed.insert(projects[i].name.clone());
            sorted.push(Arc::clone(&projects[i]));
        }
        remaining = waiting;
    }

    Ok(sorted)
}

/// Workspace-wide resolution
#[derive(Debug, Clone)]
pub struct WorkspaceResolution {
    /// Every project, with edges from each dependency to its dependents
    pub global_dag: ProjectDag,

    /// Projects in build order
    pub sorted_projects: Vec<Arc<Project>>,

    /// Transitive dependency names of every project
    pub recursive_deps: IndexMap<String, BTreeSet<String>>,
}

impl WorkspaceResolution {
    /// Whether `project` depends on `other`, directly or transitively
    pub fn depends_on(&self, project: &str, other: &str) -> bool {
        self.recursive_deps
            .get(project)
            .is_some_and(|deps| deps.contains(other))
    }

    pub fn sorted_names(&self) -> Vec<&str> {
        self.sorted_projects.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Resolve the whole workspace. Fails on any cycle.
pub fn resolve_workspace(registry: &dyn ProjectRegistry) -> StepflowResult<WorkspaceResolution> {
    let projects = registry.cached_projects();
    let sorted_projects = topo_sort(&projects)?;

    tracing::debug!(projects = projects.len(), "resolved workspace order");

    Ok(WorkspaceResolution {
        global_dag: global_dag(&projects),
        sorted_projects,
        recursive_deps: recursive_map(&projects),
    })
}

/// Views of the workspace centred on one project
#[derive(Debug, Clone)]
pub struct ProjectResolution {
    pub project: Arc<Project>,

    /// Projects that depend on this one, transitively
    pub above: Vec<Arc<Project>>,

    /// Projects this one depends on, transitively
    pub below: Vec<Arc<Project>>,

    /// Global DAG restricted to the project, `above` and `below`
    pub dag: ProjectDag,

    /// Two-hop star: `below -> project -> above`
    pub simple_dag: ProjectDag,
}

/// Resolve the graph around `name`.
///
/// Fails with `ProjectNotFound` for an unknown name and with
/// `CyclicDependency` if a cycle is reachable from the project. Cycles
/// elsewhere in the workspace do not affect the result.
pub fn resolve_for_project(
    name: &str,
    registry: &dyn ProjectRegistry,
) -> StepflowResult<ProjectResolution> {
    let project = registry.require(name)?;
    let projects = registry.cached_projects();

    check_cyclic_dependency(name, &projects, &[])?;

    let recursive = recursive_map(&projects);
    let below_names = recursive.get(name).cloned().unwrap_or_default();

    let below: Vec<Arc<Project>> = projects
        .iter()
        .filter(|p| below_names.contains(&p.name))
        .cloned()
        .collect();
    let above: Vec<Arc<Project>> = projects
        .iter()
        .filter(|p| recursive.get(&p.name).is_some_and(|deps| deps.contains(name)))
        .filter(|p| p.name != name)
        .cloned()
        .collect();

    let mut keep: HashSet<String> = HashSet::new();
    keep.insert(name.to_string());
    keep.extend(above.iter().map(|p| p.name.clone()));
    keep.extend(below.iter().map(|p| p.name.clone()));
    let dag = global_dag(&projects).restrict(&keep);

    let mut simple_dag = ProjectDag::new();
    simple_dag.add_node(name);
    for dep in &below {
        simple_dag.add_edge(&dep.name, name);
    }
    for dependent in &above {
        simple_dag.add_edge(name, &dependent.name);
    }

    Ok(ProjectResolution {
        project,
        above,
        below,
        dag,
        simple_dag,
    })
}

fn global_dag(projects: &[Arc<Project>]) -> ProjectDag {
    let mut dag = ProjectDag::new();
    for project in projects {
        dag.add_node(&project.name);
    }
    for project in projects {
        for dep in direct_dependencies(project, projects, &HashSet::new()) {
            dag.add_edge(&dep.name, &project.name);
        }
    }
    dag
}

fn recursive_map(projects: &[Arc<Project>]) -> IndexMap<String, BTreeSet<String>> {
    projects
        .iter()
        .map(|p| {
            let names = recursive_dependencies(p, projects, &mut HashSet::new())
                .into_iter()
                .map(|d| d.name.clone())
                .collect();
            (p.name.clone(), names)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{InMemoryRegistry, Pipeline};

    fn project(name: &str, deps: &[&str]) -> Project {
        let pipeline = Pipeline::default().depends_on(deps.iter().copied());
        Project::new(name, "1.0.0", format!("/ws/{}", name), pipeline).unwrap()
    }

    fn arcs(projects: Vec<Project>) -> Vec<Arc<Project>> {
        projects.into_iter().map(Arc::new).collect()
    }

    fn names(projects: &[Arc<Project>]) -> Vec<&str> {
        projects.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_topo_sort_chain_any_input_order() {
        let projects = arcs(vec![
            project("P3", &["P2"]),
            project("P1", &[]),
            project("P2", &["P1"]),
        ]);
        let sorted = topo_sort(&projects).unwrap();
        assert_eq!(names(&sorted), vec!["P1", "P2", "P3"]);
    }

    #[test]
    fn test_topo_sort_ties_keep_input_order() {
        let projects = arcs(vec![
            project("D", &["B", "C"]),
            project("C", &["A"]),
            project("B", &["A"]),
            project("A", &[]),
        ]);
        let sorted = topo_sort(&projects).unwrap();
        assert_eq!(names(&sorted), vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_topo_sort_reports_cycle() {
        let projects = arcs(vec![
            project("P0", &[]),
            project("P4", &["P5"]),
            project("P5", &["P4"]),
        ]);
        let err = topo_sort(&projects).unwrap_err();

        let cycle = err.cycle().unwrap();
        assert_eq!(cycle, ["P4", "P5", "P4"]);
        let message = err.to_string();
        assert!(message.contains("P4") && message.contains("P5"));
    }

    #[test]
    fn test_check_cyclic_dependency_chain() {
        let projects = arcs(vec![
            project("app", &["lib"]),
            project("lib", &["util"]),
            project("util", &["lib"]),
        ]);
        let err = check_cyclic_dependency("app", &projects, &[]).unwrap_err();
        match &err {
            StepflowError::CyclicDependency { chain } => {
                assert_eq!(chain, &["app", "lib", "util", "lib"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.cycle().unwrap(), ["lib", "util", "lib"]);
    }

    #[test]
    fn test_check_cyclic_dependency_self_loop() {
        let projects = arcs(vec![project("solo", &["solo"])]);
        let err = check_cyclic_dependency("solo", &projects, &[]).unwrap_err();
        assert_eq!(err.cycle().unwrap(), ["solo", "solo"]);
    }

    #[test]
    fn test_check_cyclic_dependency_acyclic_diamond() {
        let projects = arcs(vec![
            project("A", &[]),
            project("B", &["A"]),
            project("C", &["A"]),
            project("D", &["B", "C"]),
        ]);
        assert!(check_cyclic_dependency("D", &projects, &[]).is_ok());
    }

    #[test]
    fn test_recursive_dependencies_terminate_on_cycle() {
        let projects = arcs(vec![project("P4", &["P5"]), project("P5", &["P4"])]);
        let deps = recursive_dependencies(&projects[0], &projects, &mut HashSet::new());
        assert_eq!(names(&deps), vec!["P5"]);
    }

    #[test]
    fn test_direct_dependencies_drop_unknown_and_ignored() {
        let projects = arcs(vec![
            project("app", &["lib", "ghost", "util"]),
            project("lib", &[]),
            project("util", &[]),
        ]);
        let ignore: HashSet<String> = ["util".to_string()].into_iter().collect();
        let deps = direct_dependencies(&projects[0], &projects, &ignore);
        assert_eq!(names(&deps), vec!["lib"]);
    }

    #[test]
    fn test_resolve_workspace() {
        let registry = InMemoryRegistry::from_projects([
            project("web", &["api"]),
            project("api", &["core"]),
            project("core", &[]),
        ]);
        let resolution = resolve_workspace(&registry).unwrap();

        assert_eq!(resolution.sorted_names(), vec!["core", "api", "web"]);
        assert!(resolution.depends_on("web", "core"));
        assert!(!resolution.depends_on("core", "web"));
        assert_eq!(resolution.global_dag.children("core"), vec!["api"]);
    }

    #[test]
    fn test_resolve_for_project_views() {
        let registry = InMemoryRegistry::from_projects([
            project("P1", &[]),
            project("P2", &["P1"]),
            project("P3", &["P2"]),
            project("P4", &["P3"]),
            project("other", &[]),
        ]);
        let resolution = resolve_for_project("P2", &registry).unwrap();

        assert_eq!(names(&resolution.below), vec!["P1"]);
        assert_eq!(names(&resolution.above), vec!["P3", "P4"]);

        assert_eq!(resolution.dag.nodes(), vec!["P1", "P2", "P3", "P4"]);
        assert_eq!(
            resolution.dag.edges(),
            vec![("P1", "P2"), ("P2", "P3"), ("P3", "P4")]
        );
        assert_eq!(
            resolution.simple_dag.edges(),
            vec![("P1", "P2"), ("P2", "P3"), ("P2", "P4")]
        );
    }

    #[test]
    fn test_resolve_for_project_errors() {
        let registry = InMemoryRegistry::from_projects([
            project("P4", &["P5"]),
            project("P5", &["P4"]),
            project("free", &[]),
        ]);

        assert!(matches!(
            resolve_for_project("missing", &registry),
            Err(StepflowError::ProjectNotFound { .. })
        ));
        assert!(matches!(
            resolve_for_project("P5", &registry),
            Err(StepflowError::CyclicDependency { .. })
        ));
        assert!(resolve_for_project("free", &registry).is_ok());
    }
}
