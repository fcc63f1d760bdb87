// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Pipeline definition structures
//!
//! A pipeline is an ordered list of steps, a set of flows over those steps,
//! and a function naming the projects it depends on. The `run`, `sources`
//! and `status` behaviors of a step are tagged variants: a literal value, an
//! async callable, or (for `run`) an injected executor.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{CmdOutputs, Flow, FlowNavigator, Manifest, Project, StepStatus};
use crate::errors::StepflowResult;
use crate::graph::FileListing;

/// Per-call context handed to callables.
///
/// Carries the JSON configuration blob looked up for the
/// (project, flow, step) being evaluated; `Value::Null` when none exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub config: serde_json::Value,
}

impl Context {
    pub fn with_config(config: serde_json::Value) -> Self {
        Self { config }
    }
}

/// Arguments passed to step callables
#[derive(Clone, Copy)]
pub struct StepCall<'a> {
    pub step: &'a PipelineStep,
    pub project: &'a Project,
    pub flow: &'a Flow,
    pub context: &'a Context,
}

/// Arguments passed to a custom status function
#[derive(Clone, Copy)]
pub struct StatusCall<'a> {
    pub call: StepCall<'a>,
    pub manifest: Option<&'a Manifest>,
}

/// Async callable returning a shell-command template
pub type RunFn =
    Arc<dyn for<'a> Fn(StepCall<'a>) -> BoxFuture<'a, StepflowResult<String>> + Send + Sync>;

/// Async callable returning a step's sources
pub type SourcesFn =
    Arc<dyn for<'a> Fn(StepCall<'a>) -> BoxFuture<'a, StepflowResult<SourceSet>> + Send + Sync>;

/// Async callable replacing default status derivation
pub type StatusFn =
    Arc<dyn for<'a> Fn(StatusCall<'a>) -> BoxFuture<'a, StepflowResult<StepStatus>> + Send + Sync>;

/// Function naming the projects a project depends on
pub type DependencyFn = Arc<dyn Fn(&Project, &Context) -> BTreeSet<String> + Send + Sync>;

/// Injected execution capability for steps without a generic run action
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(&self, call: StepCall<'_>) -> StepflowResult<CmdOutputs>;
}

/// Discriminator for [`Run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Command,
    Callable,
    Custom,
    Unset,
}

/// How a step runs
#[derive(Clone)]
pub enum Run {
    /// Shell-command template
    Command(String),
    /// Callable producing a shell-command template
    Callable(RunFn),
    /// Injected executor
    Custom(Arc<dyn StepExecutor>),
    /// No generic run; executing the step fails
    Unset,
}

impl Run {
    pub fn kind(&self) -> RunKind {
        match self {
            Self::Command(_) => RunKind::Command,
            Self::Callable(_) => RunKind::Callable,
            Self::Custom(_) => RunKind::Custom,
            Self::Unset => RunKind::Unset,
        }
    }
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Unset => f.write_str("Unset"),
        }
    }
}

/// What a sources callable resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSet {
    /// Glob listing, resolved against the project root
    Listing(FileListing),
    /// Explicit file list, relative to the project root
    Files(Vec<PathBuf>),
}

/// Files that determine a step's fingerprint
#[derive(Clone)]
pub enum Sources {
    Listing(FileListing),
    Callable(SourcesFn),
}

impl fmt::Debug for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing(listing) => f.debug_tuple("Listing").field(listing).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// Display link attached to an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactLink {
    /// Literal URL
    Url(String),
    /// Path relative to the artifact's materialized output folder
    Relative(String),
}

impl ArtifactLink {
    /// Resolve against the artifact's output folder
    pub fn resolve(&self, output_dir: &Path) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Relative(rel) => output_dir.join(rel).to_string_lossy().to_string(),
        }
    }
}

/// A named group of output files produced by a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact id (unique within its step)
    pub id: String,

    /// Files to copy out of the project root
    pub files: FileListing,

    /// Display links
    #[serde(default)]
    pub links: Vec<ArtifactLink>,
}

impl Artifact {
    pub fn new(id: impl Into<String>, files: FileListing) -> Self {
        Self {
            id: id.into(),
            files,
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: ArtifactLink) -> Self {
        self.links.push(link);
        self
    }
}

/// A single pipeline step
#[derive(Clone)]
pub struct PipelineStep {
    /// Step id (must be unique within pipeline)
    pub id: String,

    /// Fingerprint inputs; `None` means the step is not fingerprintable
    pub sources: Option<Sources>,

    /// Run action
    pub run: Run,

    /// Custom status derivation
    pub status: Option<StatusFn>,

    /// Output artifacts, in declaration order
    pub artifacts: Vec<Artifact>,
}

impl PipelineStep {
    /// Step with no sources, no artifacts and no run action
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sources: None,
            run: Run::Unset,
            status: None,
            artifacts: Vec::new(),
        }
    }

    pub fn with_sources(mut self, listing: FileListing) -> Self {
        self.sources = Some(Sources::Listing(listing));
        self
    }

    pub fn with_sources_fn<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(StepCall<'a>) -> BoxFuture<'a, StepflowResult<SourceSet>>
            + Send
            + Sync
            + 'static,
    {
        self.sources = Some(Sources::Callable(Arc::new(f)));
        self
    }

    pub fn with_command(mut self, template: impl Into<String>) -> Self {
        self.run = Run::Command(template.into());
        self
    }

    pub fn with_run_fn<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(StepCall<'a>) -> BoxFuture<'a, StepflowResult<String>>
            + Send
            + Sync
            + 'static,
    {
        self.run = Run::Callable(Arc::new(f));
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn StepExecutor>) -> Self {
        self.run = Run::Custom(executor);
        self
    }

    pub fn with_status_fn<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(StatusCall<'a>) -> BoxFuture<'a, StepflowResult<StepStatus>>
            + Send
            + Sync
            + 'static,
    {
        self.status = Some(Arc::new(f));
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Get an artifact by id
    pub fn artifact(&self, id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }
}

impl fmt::Debug for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStep")
            .field("id", &self.id)
            .field("sources", &self.sources)
            .field("run", &self.run)
            .field("status", &self.status.as_ref().map(|_| ".."))
            .field("artifacts", &self.artifacts)
            .finish()
    }
}

/// Names of the projects a pipeline depends on
#[derive(Clone)]
pub enum Dependencies {
    Static(BTreeSet<String>),
    Dynamic(DependencyFn),
}

impl Dependencies {
    pub fn none() -> Self {
        Self::Static(BTreeSet::new())
    }

    /// Evaluate the dependency names for `project`
    pub fn names(&self, project: &Project, context: &Context) -> BTreeSet<String> {
        match self {
            Self::Static(names) => names.clone(),
            Self::Dynamic(f) => f(project, context),
        }
    }
}

impl Default for Dependencies {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(names) => f.debug_tuple("Static").field(names).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Pipeline owned by a project
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    /// Steps in declaration order
    pub steps: Vec<PipelineStep>,

    /// Named DAGs over the step ids
    pub flows: Vec<Flow>,

    /// Projects this one depends on, by name
    pub dependencies: Dependencies,
}

impl Pipeline {
    pub fn new(steps: Vec<PipelineStep>, flows: Vec<Flow>) -> Self {
        Self {
            steps,
            flows,
            dependencies: Dependencies::none(),
        }
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Dependencies::Static(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dependency_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Project, &Context) -> BTreeSet<String> + Send + Sync + 'static,
    {
        self.dependencies = Dependencies::Dynamic(Arc::new(f));
        self
    }

    /// Get a step by id
    pub fn step(&self, id: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Get a flow by name
    pub fn flow(&self, name: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.name == name)
    }

    /// Get all step ids
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    /// Step queries scoped to one flow
    pub fn navigator<'a>(&'a self, flow: &'a Flow) -> FlowNavigator<'a> {
        FlowNavigator::new(self, flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_kind_discriminator() {
        let step = PipelineStep::new("build").with_command("make");
        assert_eq!(step.run.kind(), RunKind::Command);

        let step = PipelineStep::new("gen")
            .with_run_fn(|call| Box::pin(async move { Ok(format!("echo {}", call.step.id)) }));
        assert_eq!(step.run.kind(), RunKind::Callable);

        assert_eq!(PipelineStep::new("noop").run.kind(), RunKind::Unset);
    }

    #[test]
    fn test_artifact_links_resolve() {
        let out = Path::new("/state/artifacts/app/ci/build/docs");
        let rel = ArtifactLink::Relative("index.html".into());
        let url = ArtifactLink::Url("https://example.org".into());

        assert_eq!(
            rel.resolve(out),
            "/state/artifacts/app/ci/build/docs/index.html"
        );
        assert_eq!(url.resolve(out), "https://example.org");
    }

    #[test]
    fn test_pipeline_lookup() {
        let pipeline = Pipeline::new(
            vec![PipelineStep::new("a"), PipelineStep::new("b")],
            vec![Flow::new("ci", ["a > b"])],
        );
        assert!(pipeline.step("b").is_some());
        assert!(pipeline.step("c").is_none());
        assert!(pipeline.flow("ci").is_some());
        assert_eq!(pipeline.step_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_artifact_yaml_shape() {
        let yaml = r#"
id: docs
files:
  include: ["target/doc/**"]
links:
  - relative: index.html
  - url: https://docs.example.org
"#;
        let artifact: Artifact = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(artifact.links.len(), 2);
        assert_eq!(artifact.links[0], ArtifactLink::Relative("index.html".into()));
    }
}
