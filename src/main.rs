use anyhow::{Context, Result};
use clap::Parser;
use class_metrics::classfile::{self, ClassDescriptor};
use class_metrics::classpath::{ClasspathResolver, StaticClasspath};
use class_metrics::cli::{AnalyzeArgs, Cli, Commands, OutputFormat};
use class_metrics::config::{
    ProjectConfig, load_config, resolve_log_filter, resolve_m2_repo, resolve_principles,
    resolve_project,
};
use class_metrics::engine::{Level, MetricsEngine};
use class_metrics::load::{LoadFailure, load_group};
use class_metrics::metrics::PrincipleConfig;
use class_metrics::report::{AnalysisReport, FamilySummary};
use class_metrics::scan::scan_root;
use class_metrics::source::{ClassEntry, read_class_file, read_jar_classes};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    init_tracing();
    let cli = parse_cli();

    match cli.command.clone() {
        Commands::Analyze(args) => {
            let file = load_config(&cli)?;
            let project = resolve_project(&file.project, &args);
            let principles = resolve_principles(&file.principles, &args);
            let m2_repo = if project.maven.is_empty() {
                PathBuf::new()
            } else {
                resolve_m2_repo(&cli, &project)?
            };
            let report = analyze(&project, principles, &args, m2_repo)?;
            let content = match args.format {
                OutputFormat::Json => serde_json::to_string_pretty(&report)?,
                OutputFormat::Text => report.to_text(),
            };
            write_output(&content, args.output.as_deref())?;
        }
        Commands::Inspect { path, class } => {
            let result = inspect(&path, class.as_deref())?;
            write_output(&serde_json::to_string_pretty(&result)?, None)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_new(resolve_log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_analyze(args))
}

fn rewrite_args_for_implicit_analyze(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["analyze", "inspect", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "--m2" || a == "--config" {
            idx += 2;
            continue;
        }

        if a.starts_with("--m2=") || a.starts_with("--config=") {
            idx += 1;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "analyze".to_string());
        }
    }

    args
}

fn analyze(
    project: &ProjectConfig,
    principles: PrincipleConfig,
    args: &AnalyzeArgs,
    m2_repo: PathBuf,
) -> Result<AnalysisReport> {
    let start = Instant::now();
    let roots = StaticClasspath::new(m2_repo).resolve(project)?;
    if roots.is_empty() {
        anyhow::bail!(
            "No classpath roots given. Pass a classes directory or jar, or set [project] sources in the config file"
        );
    }

    let name = project.name.clone().unwrap_or_default();
    let (group, load) = load_group(&name, &roots)?;
    let engine = MetricsEngine::new(&group, principles);

    let level = Level::from(args.level);
    let filter = args.filter_mask();
    let families = engine
        .families(level, filter)
        .with_context(|| format!("Cannot score {} nodes", level.name()))?;
    info!(
        group = %name,
        level = level.name(),
        families = families.len(),
        "analysis finished"
    );

    let mut report = AnalysisReport {
        group: name,
        level,
        filter: filter.to_string(),
        principles,
        components: load.components,
        external_classes: engine.external_classes().count(),
        duration_ms: start.elapsed().as_millis() as u64,
        families: families.iter().map(FamilySummary::from).collect(),
        failures: load.failures,
    };
    report.sort_families();
    Ok(report)
}

#[derive(Debug, Serialize)]
struct InspectedClass {
    origin: String,
    #[serde(flatten)]
    class: ClassDescriptor,
}

#[derive(Debug, Serialize)]
struct InspectResult {
    path: String,
    classes: Vec<InspectedClass>,
    failures: Vec<LoadFailure>,
}

fn inspect(path: &Path, only: Option<&str>) -> Result<InspectResult> {
    let contents = scan_root(path)?;
    let mut failures = Vec::new();
    let mut entries: Vec<ClassEntry> = Vec::new();
    for file in &contents.class_files {
        match read_class_file(file) {
            Ok(entry) => entries.push(entry),
            Err(e) => failures.push(unreadable(file, &e)),
        }
    }
    for jar in &contents.jars {
        match read_jar_classes(jar) {
            Ok(jar_entries) => entries.extend(jar_entries),
            Err(e) => failures.push(unreadable(jar, &e)),
        }
    }

    let decoded: Vec<_> = entries
        .into_par_iter()
        .map(|entry| (entry.origin, classfile::decode(&entry.bytes)))
        .collect();

    let mut classes = Vec::new();
    for (origin, result) in decoded {
        match result {
            Ok(class) if only.is_none_or(|name| class.name() == name) => {
                classes.push(InspectedClass { origin, class });
            }
            Ok(_) => {}
            Err(e) => failures.push(LoadFailure {
                origin,
                reason: e.to_string(),
            }),
        }
    }

    if let Some(name) = only
        && classes.is_empty()
    {
        anyhow::bail!("Class {name} not found under {}", path.display());
    }

    Ok(InspectResult {
        path: path.display().to_string(),
        classes,
        failures,
    })
}

fn unreadable(path: &Path, error: &anyhow::Error) -> LoadFailure {
    LoadFailure {
        origin: path.display().to_string(),
        reason: format!("{error:#}"),
    }
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    } else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
