use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::{AnalyzeArgs, Cli};
use crate::metrics::PrincipleConfig;
use crate::scan::default_m2_repository;

pub const CONFIG_ENV: &str = "CLASS_METRICS_CONFIG";
pub const LOG_ENV: &str = "CLASS_METRICS_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";
const DEFAULT_PROJECT_NAME: &str = "project";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub principles: PrincipleConfig,
    pub project: ProjectConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: Option<String>,
    pub sources: Vec<PathBuf>,
    pub required: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
    pub maven: Vec<String>,
    pub m2: Option<PathBuf>,
}

impl FileConfig {
    /// Relative roots are taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: FileConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let project = &mut config.project;
            for root in project
                .sources
                .iter_mut()
                .chain(project.required.iter_mut())
                .chain(project.libraries.iter_mut())
                .chain(project.m2.iter_mut())
            {
                if root.is_relative() {
                    *root = base.join(&*root);
                }
            }
        }
        Ok(config)
    }
}

pub fn resolve_config_path(cli: &Cli) -> Option<PathBuf> {
    if let Some(p) = cli.config.clone() {
        return Some(p);
    }

    if let Ok(p) = env::var(CONFIG_ENV)
        && !p.is_empty()
    {
        return Some(PathBuf::from(p));
    }

    let default_path = dirs::config_dir()?.join("class-metrics").join("config.toml");
    default_path.exists().then_some(default_path)
}

pub fn load_config(cli: &Cli) -> Result<FileConfig> {
    match resolve_config_path(cli) {
        Some(path) => FileConfig::load(&path),
        None => Ok(FileConfig::default()),
    }
}

pub fn resolve_m2_repo(cli: &Cli, project: &ProjectConfig) -> Result<PathBuf> {
    if let Some(p) = cli.m2.clone() {
        return Ok(p);
    }
    if let Some(p) = project.m2.clone() {
        return Ok(p);
    }
    default_m2_repository()
}

/// File values first, then whatever the command line adds.
pub fn resolve_project(file: &ProjectConfig, args: &AnalyzeArgs) -> ProjectConfig {
    let mut project = file.clone();
    if let Some(name) = args.name.clone() {
        project.name = Some(name);
    }
    if project.name.is_none() {
        project.name = Some(DEFAULT_PROJECT_NAME.to_string());
    }
    project.sources.extend(args.sources.iter().cloned());
    project.sources.extend(args.roots.iter().cloned());
    project.required.extend(args.required.iter().cloned());
    project.libraries.extend(args.libraries.iter().cloned());
    project.maven.extend(args.maven.iter().cloned());
    project
}

pub fn resolve_principles(file: &PrincipleConfig, args: &AnalyzeArgs) -> PrincipleConfig {
    PrincipleConfig {
        dip: file.dip && !args.no_dip,
        sdp: file.sdp && !args.no_sdp,
        adp: file.adp && !args.no_adp,
        sap: file.sap && !args.no_sap,
    }
}

pub fn resolve_log_filter() -> String {
    env::var(LOG_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}
