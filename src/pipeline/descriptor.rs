// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Project descriptors
//!
//! Defines the schema for `stepflow.yaml` files and turns them into
//! [`Project`] values. Descriptors can only express static behavior
//! (glob sources, command templates, named dependencies); callables and
//! custom executors are attached from code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{Artifact, Flow, Pipeline, PipelineStep, Project};
use crate::config::DiscoverySettings;
use crate::errors::{StepflowError, StepflowResult};
use crate::graph::FileListing;

/// Project descriptor from `stepflow.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Names of projects this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Steps in declaration order
    #[serde(default)]
    pub steps: Vec<StepDescriptor>,

    /// Flows over the steps
    #[serde(default)]
    pub flows: Vec<FlowDescriptor>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

/// A step in a descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub id: String,

    /// Fingerprint inputs
    #[serde(default)]
    pub sources: Option<FileListing>,

    /// Shell-command template
    #[serde(default)]
    pub run: Option<String>,

    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// A flow in a descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDescriptor {
    pub name: String,
    pub dag: Vec<String>,
}

impl ProjectDescriptor {
    /// Load a descriptor from a YAML file
    pub fn from_file(path: &Path) -> StepflowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StepflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a descriptor from a YAML string
    pub fn from_yaml(yaml: &str) -> StepflowResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Build the project rooted at `root`
    pub fn into_project(self, root: PathBuf) -> StepflowResult<Project> {
        let steps = self
            .steps
            .into_iter()
            .map(|s| {
                let mut step = PipelineStep::new(s.id);
                if let Some(listing) = s.sources {
                    step = step.with_sources(listing);
                }
                if let Some(run) = s.run {
                    step = step.with_command(run);
                }
                step.artifacts = s.artifacts;
                step
            })
            .collect();

        let flows = self
            .flows
            .into_iter()
            .map(|f| Flow::new(f.name, f.dag))
            .collect();

        let pipeline = Pipeline::new(steps, flows).depends_on(self.dependencies);
        Project::new(self.name, self.version, root, pipeline)
    }
}

/// Find and load every descriptor under `workspace`.
///
/// One-shot scan. Fails on duplicate project names.
pub fn discover(workspace: &Path, settings: &DiscoverySettings) -> StepflowResult<Vec<Project>> {
    let ignore = settings
        .ignore
        .iter()
        .map(|p| glob::Pattern::new(p))
        .collect::<Result<Vec<_>, _>>()?;

    let pattern = format!(
        "{}/**/{}",
        glob::Pattern::escape(&workspace.to_string_lossy()).trim_end_matches('/'),
        glob::Pattern::escape(&settings.descriptor)
    );

    let mut paths: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(Result::ok)
        .filter(|path| {
            let relative = path.strip_prefix(workspace).unwrap_or(path);
            !ignore.iter().any(|p| p.matches_path(relative))
        })
        .collect();
    paths.sort();

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut projects = Vec::with_capacity(paths.len());

    for path in paths {
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace.to_path_buf());
        let project = ProjectDescriptor::from_file(&path)?.into_project(root)?;

        if let Some(previous) = seen.insert(project.name.clone(), path.clone()) {
            return Err(StepflowError::InvalidPipeline {
                project: project.name,
                reason: format!(
                    "declared twice: {} and {}",
                    previous.display(),
                    path.display()
                ),
            });
        }

        tracing::debug!(project = %project.name, path = %path.display(), "discovered project");
        projects.push(project);
    }

    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Context, RunKind};
    use std::fs;
    use tempfile::TempDir;

    const APP: &str = r#"
name: app
version: 1.2.0
dependencies: [lib]
steps:
  - id: build
    sources:
      include: ["src/**/*.rs"]
      ignore: ["src/generated/**"]
    run: "cargo build -p {project.name}"
    artifacts:
      - id: bin
        files:
          include: ["target/debug/app"]
  - id: test
    run: cargo test
flows:
  - name: ci
    dag: ["build > test"]
"#;

    #[test]
    fn test_parse_descriptor() {
        let descriptor = ProjectDescriptor::from_yaml(APP).unwrap();
        assert_eq!(descriptor.name, "app");
        assert_eq!(descriptor.steps.len(), 2);
        assert_eq!(descriptor.steps[0].artifacts[0].id, "bin");
    }

    #[test]
    fn test_into_project() {
        let project = ProjectDescriptor::from_yaml(APP)
            .unwrap()
            .into_project(PathBuf::from("/ws/app"))
            .unwrap();

        let build = project.pipeline.step("build").unwrap();
        assert_eq!(build.run.kind(), RunKind::Command);
        assert!(build.sources.is_some());
        assert!(project.pipeline.step("test").unwrap().sources.is_none());

        let deps = project
            .pipeline
            .dependencies
            .names(&project, &Context::default());
        assert!(deps.contains("lib"));
    }

    #[test]
    fn test_discover_skips_ignored() {
        let dir = TempDir::new().unwrap();
        let ws = dir.path();
        fs::create_dir_all(ws.join("app")).unwrap();
        fs::create_dir_all(ws.join("lib")).unwrap();
        fs::create_dir_all(ws.join("node_modules/x")).unwrap();
        fs::write(ws.join("app/stepflow.yaml"), APP).unwrap();
        fs::write(ws.join("lib/stepflow.yaml"), "name: lib\n").unwrap();
        fs::write(ws.join("node_modules/x/stepflow.yaml"), "name: vendored\n").unwrap();

        let projects = discover(ws, &DiscoverySettings::default()).unwrap();
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();

        assert_eq!(names, vec!["app", "lib"]);
        assert_eq!(projects[0].path, ws.join("app"));
    }

    #[test]
    fn test_discover_rejects_duplicate_names() {
        let dir = TempDir::new().unwrap();
        let ws = dir.path();
        for sub in ["one", "two"] {
            fs::create_dir_all(ws.join(sub)).unwrap();
            fs::write(ws.join(sub).join("stepflow.yaml"), "name: same\n").unwrap();
        }

        let err = discover(ws, &DiscoverySettings::default()).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }
}
