use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use crate::config::ProjectConfig;
use crate::scan::maven_artifact_path;

/// Roots of a project, split by the role their components play.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRoots {
    pub sources: Vec<PathBuf>,
    pub required: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
}

impl ProjectRoots {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.required.is_empty() && self.libraries.is_empty()
    }
}

/// Turns a project description into concrete classpath roots.
pub trait ClasspathResolver {
    fn resolve(&self, project: &ProjectConfig) -> Result<ProjectRoots>;
}

/// Uses the listed roots as-is and looks Maven coordinates up in a local
/// repository. Nothing is downloaded.
#[derive(Debug, Clone)]
pub struct StaticClasspath {
    m2_repo: PathBuf,
}

impl StaticClasspath {
    pub fn new(m2_repo: PathBuf) -> Self {
        Self { m2_repo }
    }
}

impl ClasspathResolver for StaticClasspath {
    fn resolve(&self, project: &ProjectConfig) -> Result<ProjectRoots> {
        let mut libraries = project.libraries.clone();
        for coordinate in &project.maven {
            let jar = maven_artifact_path(&self.m2_repo, coordinate)?;
            anyhow::ensure!(
                jar.is_file(),
                "Maven artifact {coordinate} not found at {}",
                jar.display()
            );
            debug!(%coordinate, jar = %jar.display(), "resolved maven artifact");
            libraries.push(jar);
        }

        let roots = ProjectRoots {
            sources: dedup(project.sources.clone()),
            required: dedup(project.required.clone()),
            libraries: dedup(libraries),
        };
        for root in roots
            .sources
            .iter()
            .chain(&roots.required)
            .chain(&roots.libraries)
        {
            std::fs::metadata(root)
                .with_context(|| format!("Classpath root does not exist: {}", root.display()))?;
        }
        Ok(roots)
    }
}

fn dedup(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
