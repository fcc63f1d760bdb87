// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Step scheduler
//!
//! [`StepEngine`] runs steps, records their manifests, materializes their
//! artifacts, and tracks which steps are in flight.
//!
//! Every run body executes on its own tokio task. Dropping the future
//! returned by [`StepEngine::run_step`] detaches the body rather than
//! cancelling it, so a started run always gets its manifest written.

use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use super::{
    compute_fingerprint, derive_status, dispatch, ConfigLookup, EngineEvent, EventSink,
    Fingerprint, NoConfig, ProcessRunner, ShellRunner, StoreLayout, TracingSink,
};
use crate::config::WorkspaceConfig;
use crate::errors::{StepflowError, StepflowResult};
use crate::graph::{FileSystem, LocalFileSystem};
use crate::pipeline::{
    CmdOutputs, Context, Flow, Manifest, PipelineStep, Project, ProjectRegistry, StepCall, StepKey,
    StepStatus,
};

struct EngineInner {
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn ProcessRunner>,
    registry: Arc<dyn ProjectRegistry>,
    layout: StoreLayout,
    events: Arc<dyn EventSink>,
    config: Arc<dyn ConfigLookup>,
    env: BTreeMap<String, String>,
    running: Mutex<HashSet<StepKey>>,
    /// Signalled whenever a key leaves the running set
    finished: Notify,
}

impl EngineInner {
    fn running(&self) -> MutexGuard<'_, HashSet<StepKey>> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Membership in the running set, released on drop
struct RunningGuard {
    inner: Arc<EngineInner>,
    key: StepKey,
}

impl RunningGuard {
    fn acquire(inner: &Arc<EngineInner>, key: &StepKey) -> StepflowResult<Self> {
        if !inner.running().insert(key.clone()) {
            return Err(StepflowError::StepAlreadyRunning {
                key: key.to_string(),
            });
        }
        Ok(Self {
            inner: Arc::clone(inner),
            key: key.clone(),
        })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.inner.running().remove(&self.key);
        self.inner.finished.notify_waiters();
    }
}

/// Builder for [`StepEngine`]
pub struct StepEngineBuilder {
    registry: Arc<dyn ProjectRegistry>,
    state_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn ProcessRunner>,
    events: Arc<dyn EventSink>,
    config: Arc<dyn ConfigLookup>,
    env: BTreeMap<String, String>,
}

impl StepEngineBuilder {
    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(mut self, config: Arc<dyn ConfigLookup>) -> Self {
        self.config = config;
        self
    }

    /// Extra environment for every command run
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn build(self) -> StepEngine {
        StepEngine {
            inner: Arc::new(EngineInner {
                fs: self.fs,
                runner: self.runner,
                registry: self.registry,
                layout: StoreLayout::new(self.state_dir),
                events: self.events,
                config: self.config,
                env: self.env,
                running: Mutex::new(HashSet::new()),
                finished: Notify::new(),
            }),
        }
    }
}

/// Step execution engine. Cheap to clone; clones share the running set.
#[derive(Clone)]
pub struct StepEngine {
    inner: Arc<EngineInner>,
}

/// Borrowed view of the project, flow and step a key names
struct Located<'a> {
    project: &'a Project,
    flow: &'a Flow,
    step: &'a PipelineStep,
}

fn locate<'a>(project: &'a Project, key: &StepKey) -> StepflowResult<Located<'a>> {
    let flow = project
        .pipeline
        .flow(&key.flow)
        .ok_or_else(|| StepflowError::FlowNotFound {
            project: project.name.clone(),
            flow: key.flow.clone(),
        })?;

    let step = project
        .pipeline
        .step(&key.step)
        .filter(|step| flow.contains(&step.id))
        .ok_or_else(|| StepflowError::StepNotFound {
            project: project.name.clone(),
            step: key.step.clone(),
        })?;

    Ok(Located {
        project,
        flow,
        step,
    })
}

impl StepEngine {
    /// Start building an engine with local-disk, `sh` and tracing defaults
    pub fn builder(
        registry: Arc<dyn ProjectRegistry>,
        state_dir: impl Into<PathBuf>,
    ) -> StepEngineBuilder {
        StepEngineBuilder {
            registry,
            state_dir: state_dir.into(),
            fs: Arc::new(LocalFileSystem::new()),
            runner: Arc::new(ShellRunner::new()),
            events: Arc::new(TracingSink),
            config: Arc::new(NoConfig),
            env: BTreeMap::new(),
        }
    }

    /// Engine configured from a workspace's `stepflow.toml`
    pub fn from_config(
        registry: Arc<dyn ProjectRegistry>,
        workspace: &Path,
        config: &WorkspaceConfig,
    ) -> Self {
        Self::builder(registry, config.state_dir(workspace))
            .runner(Arc::new(ShellRunner::with_shell(config.engine.shell.clone())))
            .env(config.engine.env.clone())
            .build()
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.inner.layout
    }

    pub fn registry(&self) -> &Arc<dyn ProjectRegistry> {
        &self.inner.registry
    }

    /// Steps currently executing, sorted
    pub fn running_steps(&self) -> Vec<StepKey> {
        let mut keys: Vec<StepKey> = self.inner.running().iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_running(&self, key: &StepKey) -> bool {
        self.inner.running().contains(key)
    }

    /// Wait until no run of `key` is in flight
    async fn wait_until_idle(&self, key: &StepKey) {
        loop {
            let finished = self.inner.finished.notified();
            tokio::pin!(finished);
            finished.as_mut().enable();

            if !self.is_running(key) {
                return;
            }
            finished.await;
        }
    }

    fn context(&self, key: &StepKey) -> Context {
        Context::with_config(self.inner.config.lookup(key))
    }

    /// Last manifest written for a step
    pub async fn read_manifest(&self, key: &StepKey) -> StepflowResult<Option<Manifest>> {
        let project = self.inner.registry.require(&key.project)?;
        locate(&project, key)?;
        self.inner
            .layout
            .read_manifest(self.inner.fs.as_ref(), key)
            .await
    }

    /// Current fingerprint of a step's sources
    pub async fn fingerprint(&self, key: &StepKey) -> StepflowResult<Fingerprint> {
        let project = self.inner.registry.require(&key.project)?;
        let located = locate(&project, key)?;
        let context = self.context(key);
        let call = StepCall {
            step: located.step,
            project: located.project,
            flow: located.flow,
            context: &context,
        };
        compute_fingerprint(self.inner.fs.as_ref(), call).await
    }

    /// Status of a step; `Running` while a run of it is in flight
    pub async fn status(&self, key: &StepKey) -> StepflowResult<StepStatus> {
        self.inner
            .events
            .emit(EngineEvent::StatusCheckStarted { key: key.clone() });

        let project = self.inner.registry.require(&key.project)?;
        let located = locate(&project, key)?;

        if self.is_running(key) {
            return Ok(StepStatus::Running);
        }

        let fs = self.inner.fs.as_ref();
        let manifest = self.inner.layout.read_manifest(fs, key).await?;
        let context = self.context(key);
        let call = StepCall {
            step: located.step,
            project: located.project,
            flow: located.flow,
            context: &context,
        };

        derive_status(fs, &self.inner.layout, key, call, manifest.as_ref()).await
    }

    /// Status of every step in a flow, in pipeline order
    pub async fn flow_status(
        &self,
        project: &str,
        flow: &str,
    ) -> StepflowResult<Vec<(String, StepStatus)>> {
        let found = self.inner.registry.require(project)?;
        let flow_def = found
            .pipeline
            .flow(flow)
            .ok_or_else(|| StepflowError::FlowNotFound {
                project: project.to_string(),
                flow: flow.to_string(),
            })?;

        let mut statuses = Vec::new();
        for step in found.pipeline.navigator(flow_def).steps_in_flow() {
            let key = StepKey::new(project, flow, step.id.clone());
            statuses.push((step.id.clone(), self.status(&key).await?));
        }
        Ok(statuses)
    }

    /// Execute a step's run action without recording anything
    pub async fn execute_run(&self, key: &StepKey) -> StepflowResult<CmdOutputs> {
        let project = self.inner.registry.require(&key.project)?;
        let located = locate(&project, key)?;
        let context = self.context(key);
        let call = StepCall {
            step: located.step,
            project: located.project,
            flow: located.flow,
            context: &context,
        };
        dispatch::execute_run(self.inner.runner.as_ref(), &self.inner.env, call).await
    }

    /// Run a step and record the outcome.
    ///
    /// With `run_upstream`, every direct upstream step that is not `Ok` is
    /// run first (recursively, in pipeline order). A failed run still writes
    /// its manifest before the error is returned. A second trigger of a key
    /// that is already running fails with `StepAlreadyRunning`.
    pub fn run_step(
        &self,
        key: StepKey,
        run_upstream: bool,
    ) -> BoxFuture<'static, StepflowResult<Manifest>> {
        let engine = self.clone();
        Box::pin(async move {
            let project = engine.inner.registry.require(&key.project)?;
            locate(&project, &key)?;

            let guard = RunningGuard::acquire(&engine.inner, &key)?;
            let body = tokio::spawn(async move {
                let _guard = guard;
                engine.run_registered(project, key, run_upstream).await
            });
            body.await?
        })
    }

    async fn run_registered(
        &self,
        project: Arc<Project>,
        key: StepKey,
        run_upstream: bool,
    ) -> StepflowResult<Manifest> {
        self.inner
            .events
            .emit(EngineEvent::RunStarted { key: key.clone() });

        let result = self.cascade_and_run(&project, &key, run_upstream).await;

        self.inner.events.emit(EngineEvent::RunDone {
            key,
            succeeded: result.is_ok(),
        });
        result
    }

    async fn cascade_and_run(
        &self,
        project: &Project,
        key: &StepKey,
        run_upstream: bool,
    ) -> StepflowResult<Manifest> {
        let located = locate(project, key)?;

        if run_upstream {
            let upstream: Vec<StepKey> = project
                .pipeline
                .navigator(located.flow)
                .direct_upstream_of(&key.step)
                .into_iter()
                .map(|step| key.sibling(step.id.clone()))
                .collect();

            for upstream_key in upstream {
                self.refresh_upstream(key, upstream_key).await?;
            }
        }

        let fs = self.inner.fs.as_ref();
        let context = self.context(key);
        let call = StepCall {
            step: located.step,
            project: located.project,
            flow: located.flow,
            context: &context,
        };

        let outcome = async {
            let outputs = dispatch::execute_run(self.inner.runner.as_ref(), &self.inner.env, call).await?;
            let fingerprint = match outputs.explicit_fingerprint() {
                Some(checksum) => Fingerprint {
                    checksum,
                    files: Vec::new(),
                },
                None => compute_fingerprint(fs, call).await?,
            };
            Ok::<_, StepflowError>((outputs, fingerprint))
        }
        .await;

        let manifest = match &outcome {
            Ok((outputs, fingerprint)) => Manifest::new(
                true,
                fingerprint.checksum.clone(),
                fingerprint.files.clone(),
                outputs.clone(),
            ),
            Err(error) => {
                tracing::warn!(step = %key, "{}", error);
                let fingerprint = compute_fingerprint(fs, call).await.unwrap_or_default();
                Manifest::new(
                    false,
                    fingerprint.checksum,
                    fingerprint.files,
                    CmdOutputs::Lines(error.captured_outputs()),
                )
            }
        };

        let output_dir = self.inner.layout.step_output_dir(key);
        let cleared = fs.replace_dir(&output_dir).await;
        if let Err(e) = &cleared {
            tracing::warn!(step = %key, path = %output_dir.display(), "could not reset output folder: {}", e);
        }

        self.inner.layout.write_manifest(fs, key, &manifest).await?;

        outcome?;
        cleared?;

        self.materialize_artifacts(located, key).await?;
        Ok(manifest)
    }

    /// Bring one upstream step to `Ok`.
    ///
    /// A run of it already in flight (another cascade sharing the same
    /// upstream) is waited for, then the status is checked again.
    async fn refresh_upstream(&self, key: &StepKey, upstream: StepKey) -> StepflowResult<()> {
        loop {
            self.wait_until_idle(&upstream).await;

            let status = self.status(&upstream).await?;
            if status == StepStatus::Ok {
                return Ok(());
            }

            tracing::info!(step = %key, upstream = %upstream, %status, "running upstream step");
            match self.run_step(upstream.clone(), true).await {
                Err(StepflowError::StepAlreadyRunning { .. }) => continue,
                other => return other.map(|_| ()),
            }
        }
    }

    /// Copy each artifact's matching files out of the project root
    async fn materialize_artifacts(&self, located: Located<'_>, key: &StepKey) -> StepflowResult<()> {
        let fs = self.inner.fs.as_ref();
        let root = located.project.root();

        for artifact in &located.step.artifacts {
            let dir = self.inner.layout.artifact_dir(key, &artifact.id);
            fs.create_dir(&dir).await?;

            let files = fs.list(root, &artifact.files).await?;
            for file in &files {
                fs.copy_file(&root.join(file), &dir.join(file)).await?;
            }

            tracing::debug!(step = %key, artifact = %artifact.id, files = files.len(), "materialized artifact");
        }

        Ok(())
    }
}
