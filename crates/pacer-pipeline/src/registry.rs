//! Named project lookup.
//!
//! The registry is built once at startup from `projects/*/project.json` and
//! handed to whatever needs to resolve a project by name.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::PipelineError;
use crate::project::{PROJECT_FILE, Project};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("project '{0}' already exists")]
    Duplicate(String),

    #[error("project '{0}' does not exist")]
    NotFound(String),
}

#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: BTreeMap<String, Project>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every project declared under `projects_dir`.
    ///
    /// A missing directory yields an empty registry.
    pub fn load_dir(projects_dir: &Path) -> Result<Self, PipelineError> {
        let mut registry = Self::new();
        if !projects_dir.is_dir() {
            debug!(path = %projects_dir.display(), "no projects directory");
            return Ok(registry);
        }
        let entries = fs::read_dir(projects_dir).map_err(|source| PipelineError::Io {
            path: projects_dir.to_path_buf(),
            source,
        })?;
        let mut dirs: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let config = dir.join(PROJECT_FILE);
            if config.exists() {
                registry.register(Project::load(&config, projects_dir)?)?;
            }
        }
        info!(projects = registry.len(), "loaded project registry");
        Ok(registry)
    }

    pub fn register(&mut self, project: Project) -> Result<(), RegistryError> {
        if self.projects.contains_key(project.name()) {
            return Err(RegistryError::Duplicate(project.name().to_string()));
        }
        self.projects.insert(project.name().to_string(), project);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Project, RegistryError> {
        self.projects
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// All projects, ordered by name.
    pub fn all(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
