use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

pub fn default_m2_repository() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to resolve home directory"))?;
    Ok(home.join(".m2").join("repository"))
}

/// Jar of a `group:artifact:version` coordinate inside a local Maven repository.
pub fn maven_artifact_path(m2_repo: &Path, coordinate: &str) -> Result<PathBuf> {
    let parts: Vec<&str> = coordinate.trim().split(':').collect();
    let [group, artifact, version] = parts[..] else {
        anyhow::bail!("Invalid Maven coordinate `{coordinate}`, expected group:artifact:version");
    };
    if group.is_empty() || artifact.is_empty() || version.is_empty() {
        anyhow::bail!("Invalid Maven coordinate `{coordinate}`, expected group:artifact:version");
    }

    let mut path = m2_repo.to_path_buf();
    path.extend(group.split('.'));
    path.push(artifact);
    path.push(version);
    path.push(format!("{artifact}-{version}.jar"));
    Ok(path)
}

/// Class files and jars found under one classpath root.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RootContents {
    pub class_files: Vec<PathBuf>,
    pub jars: Vec<PathBuf>,
}

impl RootContents {
    pub fn is_empty(&self) -> bool {
        self.class_files.is_empty() && self.jars.is_empty()
    }
}

/// A root may be a directory, a single jar or a single class file.
pub fn scan_root(root: &Path) -> Result<RootContents> {
    let meta = std::fs::metadata(root)
        .with_context(|| format!("Classpath root does not exist: {}", root.display()))?;

    let mut contents = RootContents::default();
    if meta.is_file() {
        match classify(root) {
            Some(EntryKind::Jar) => contents.jars.push(root.to_path_buf()),
            Some(EntryKind::Class) => contents.class_files.push(root.to_path_buf()),
            None => anyhow::bail!(
                "Classpath root is neither a jar nor a class file: {}",
                root.display()
            ),
        }
        return Ok(contents);
    }

    let (tx, rx) = mpsc::channel();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry
                && entry.file_type().is_some_and(|t| t.is_file())
                && let Some(kind) = classify(entry.path())
            {
                let _ = tx.send((kind, entry.path().to_path_buf()));
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    for (kind, path) in rx {
        match kind {
            EntryKind::Jar => contents.jars.push(path),
            EntryKind::Class => contents.class_files.push(path),
        }
    }
    contents.class_files.sort();
    contents.jars.sort();
    Ok(contents)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Jar,
    Class,
}

fn classify(path: &Path) -> Option<EntryKind> {
    if path.file_name().is_some_and(|n| n == "module-info.class" || n == "package-info.class") {
        return None;
    }
    match path.extension()?.to_str()? {
        "jar" => Some(EntryKind::Jar),
        "class" => Some(EntryKind::Class),
        _ => None,
    }
}
