// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Projects and the project registry

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::{Pipeline, PipelineValidator};
use crate::errors::{StepflowError, StepflowResult};

/// Separator between a project's publish name and its variant suffix
pub const VARIANT_SEPARATOR: char = '~';

/// A buildable unit of the workspace
#[derive(Debug, Clone)]
pub struct Project {
    /// Project name (unique within workspace)
    pub name: String,

    /// Version string, usually semver
    pub version: String,

    /// Project root directory
    pub path: PathBuf,

    /// Owned pipeline
    pub pipeline: Pipeline,
}

impl Project {
    /// Create a project, validating its pipeline
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<PathBuf>,
        pipeline: Pipeline,
    ) -> StepflowResult<Self> {
        let name = name.into();
        let validation = PipelineValidator::validate(&pipeline);

        if !validation.is_valid() {
            return Err(StepflowError::InvalidPipeline {
                project: name,
                reason: validation.errors.join("; "),
            });
        }

        for warning in &validation.warnings {
            tracing::warn!(project = %name, "{}", warning);
        }

        Ok(Self {
            name,
            version: version.into(),
            path: path.into(),
            pipeline,
        })
    }

    /// Name before any `~` variant suffix
    pub fn publish_name(&self) -> &str {
        self.name
            .split(VARIANT_SEPARATOR)
            .next()
            .unwrap_or(&self.name)
    }

    /// Stable external key: URL-safe base64 of the name
    pub fn id(&self) -> String {
        Self::id_for(&self.name)
    }

    pub fn id_for(name: &str) -> String {
        URL_SAFE_NO_PAD.encode(name.as_bytes())
    }

    /// Decode a project id back to its name
    pub fn name_from_id(id: &str) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode(id).ok()?;
        String::from_utf8(bytes).ok()
    }

    pub fn root(&self) -> &Path {
        &self.path
    }
}

/// Read-only view of the discovered projects
pub trait ProjectRegistry: Send + Sync {
    /// All projects, in registry order
    fn cached_projects(&self) -> Vec<Arc<Project>>;

    /// Look up a project by id
    fn by_id(&self, id: &str) -> Option<Arc<Project>> {
        self.cached_projects().into_iter().find(|p| p.id() == id)
    }

    /// Look up a project by name
    fn by_name(&self, name: &str) -> Option<Arc<Project>> {
        self.cached_projects().into_iter().find(|p| p.name == name)
    }

    /// Look up a project by name, failing with `ProjectNotFound`
    fn require(&self, name: &str) -> StepflowResult<Arc<Project>> {
        self.by_name(name)
            .ok_or_else(|| StepflowError::ProjectNotFound {
                name: name.to_string(),
            })
    }
}

/// In-memory registry keyed by project id.
///
/// Written by discovery, read by the resolver and the engine.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    projects: RwLock<IndexMap<String, Arc<Project>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_projects<I>(projects: I) -> Self
    where
        I: IntoIterator<Item = Project>,
    {
        let registry = Self::new();
        registry.replace_all(projects);
        registry
    }

    /// Replace the whole registry contents
    pub fn replace_all<I>(&self, projects: I)
    where
        I: IntoIterator<Item = Project>,
    {
        let map = projects
            .into_iter()
            .map(|p| (p.id(), Arc::new(p)))
            .collect();
        *self.write() = map;
    }

    /// Insert or replace a single project
    pub fn upsert(&self, project: Project) {
        self.write().insert(project.id(), Arc::new(project));
    }

    /// Remove a project by name
    pub fn remove(&self, name: &str) -> Option<Arc<Project>> {
        self.write().shift_remove(&Project::id_for(name))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<String, Arc<Project>>> {
        self.projects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, IndexMap<String, Arc<Project>>> {
        self.projects.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProjectRegistry for InMemoryRegistry {
    fn cached_projects(&self) -> Vec<Arc<Project>> {
        self.read().values().cloned().collect()
    }

    fn by_id(&self, id: &str) -> Option<Arc<Project>> {
        self.read().get(id).cloned()
    }

    fn by_name(&self, name: &str) -> Option<Arc<Project>> {
        self.by_id(&Project::id_for(name))
    }
}
