//! Turns classpath roots into a frozen [`Group`].
//!
//! A directory's loose class files form one component named after the
//! directory; every jar found under a root is a component of its own.

use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::classfile;
use crate::classpath::ProjectRoots;
use crate::model::{Component, ComponentBuilder, ComponentRole, Group};
use crate::scan::scan_root;
use crate::source::{ClassEntry, read_class_file, read_jar_classes};

/// An entry that could not be added to its component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub origin: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub role: ComponentRole,
    pub packages: usize,
    pub classes: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct LoadReport {
    pub components: Vec<ComponentSummary>,
    pub failures: Vec<LoadFailure>,
}

/// Decodes entries in parallel, then adds them in input order. Undecodable
/// entries and repeated class names are reported, never fatal.
pub fn load_component(name: &str, entries: Vec<ClassEntry>) -> (Component, Vec<LoadFailure>) {
    let decoded: Vec<_> = entries
        .into_par_iter()
        .map(|entry| {
            let result = classfile::decode(&entry.bytes);
            (entry.origin, result)
        })
        .collect();

    let mut builder = ComponentBuilder::new(name);
    let mut failures = Vec::new();
    for (origin, result) in decoded {
        let outcome = result
            .map_err(|e| e.to_string())
            .and_then(|class| builder.add_class(class).map_err(|e| e.to_string()));
        if let Err(reason) = outcome {
            warn!(component = name, %origin, %reason, "skipping class");
            failures.push(LoadFailure { origin, reason });
        }
    }

    let component = builder.build();
    info!(
        component = name,
        packages = component.packages().count(),
        classes = component.class_count(),
        failures = failures.len(),
        "component loaded"
    );
    (component, failures)
}

/// Loads every root of the project into one group.
pub fn load_group(name: &str, roots: &ProjectRoots) -> Result<(Group, LoadReport)> {
    let mut report = LoadReport::default();
    let mut names = HashSet::new();
    let mut members = Vec::new();

    let by_role = [
        (ComponentRole::Sources, &roots.sources),
        (ComponentRole::Required, &roots.required),
        (ComponentRole::Libraries, &roots.libraries),
    ];
    for (role, paths) in by_role {
        for root in paths {
            let components = match root_components(root, &mut report.failures) {
                Ok(components) => components,
                Err(e) => {
                    record(&mut report.failures, root, &e);
                    continue;
                }
            };
            for (component_name, entries) in components {
                let component_name = unique_name(&mut names, component_name);
                let (component, failures) = load_component(&component_name, entries);
                report.failures.extend(failures);
                report.components.push(ComponentSummary {
                    name: component_name,
                    role,
                    packages: component.packages().count(),
                    classes: component.class_count(),
                });
                members.push((role, component));
            }
        }
    }

    let group = Group::new(name, members)?;
    debug!(group = name, classes = group.class_count(), "group frozen");
    Ok((group, report))
}

fn root_components(
    root: &Path,
    failures: &mut Vec<LoadFailure>,
) -> Result<Vec<(String, Vec<ClassEntry>)>> {
    let contents = scan_root(root)?;
    debug!(
        root = %root.display(),
        class_files = contents.class_files.len(),
        jars = contents.jars.len(),
        "scanned root"
    );

    let mut components = Vec::new();
    if !contents.class_files.is_empty() {
        let entries: Vec<ClassEntry> = contents
            .class_files
            .iter()
            .filter_map(|path| match read_class_file(path) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    record(failures, path, &e);
                    None
                }
            })
            .collect();
        components.push((display_name(root), entries));
    }
    for jar in &contents.jars {
        match read_jar_classes(jar) {
            Ok(entries) => components.push((display_name(jar), entries)),
            Err(e) => record(failures, jar, &e),
        }
    }
    Ok(components)
}

fn record(failures: &mut Vec<LoadFailure>, path: &Path, error: &anyhow::Error) {
    let reason = format!("{error:#}");
    warn!(origin = %path.display(), %reason, "skipping unreadable input");
    failures.push(LoadFailure {
        origin: path.display().to_string(),
        reason,
    });
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty() && s != ".")
        .unwrap_or_else(|| path.display().to_string())
}

fn unique_name(taken: &mut HashSet<String>, name: String) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{name}~{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_builder::ClassFileBuilder;
    use std::fs;
    use std::io::Write;
    use std::path::PathBuf;
    use zip::write::{FileOptions, ZipWriter};

    fn temp_dir(prefix: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "{prefix}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    fn entry(origin: &str, bytes: Vec<u8>) -> ClassEntry {
        ClassEntry {
            origin: origin.to_string(),
            bytes,
        }
    }

    #[test]
    fn bad_entries_and_duplicates_become_failures() {
        let cart = ClassFileBuilder::new("shop/Cart").build();
        let entries = vec![
            entry("a/Cart.class", cart.clone()),
            entry("b/Broken.class", vec![0xCA, 0xFE]),
            entry("c/Cart.class", cart),
            entry("d/Item.class", ClassFileBuilder::new("shop/Item").build()),
        ];

        let (component, failures) = load_component("app", entries);
        assert_eq!(component.class_count(), 2);
        let origins: Vec<&str> = failures.iter().map(|f| f.origin.as_str()).collect();
        assert_eq!(origins, vec!["b/Broken.class", "c/Cart.class"]);
        assert!(failures[1].reason.contains("already exists"));
    }

    #[test]
    fn roots_split_into_directory_and_jar_components() {
        let base = temp_dir("class-metrics-load");
        let classes = base.join("classes");
        fs::create_dir_all(classes.join("shop")).unwrap();
        fs::write(
            classes.join("shop/Cart.class"),
            ClassFileBuilder::new("shop/Cart").class_ref("util/Money").build(),
        )
        .unwrap();

        let lib = base.join("lib");
        fs::create_dir_all(&lib).unwrap();
        let mut zip = ZipWriter::new(fs::File::create(lib.join("util.jar")).unwrap());
        zip.start_file("util/Money.class", FileOptions::default()).unwrap();
        zip.write_all(&ClassFileBuilder::new("util/Money").build()).unwrap();
        zip.finish().unwrap();
        fs::write(lib.join("broken.jar"), b"not a zip").unwrap();

        let roots = ProjectRoots {
            sources: vec![classes],
            libraries: vec![lib],
            ..ProjectRoots::default()
        };
        let (group, report) = load_group("shop", &roots).unwrap();

        let names: Vec<(&str, ComponentRole)> = report
            .components
            .iter()
            .map(|c| (c.name.as_str(), c.role))
            .collect();
        assert_eq!(
            names,
            vec![
                ("classes", ComponentRole::Sources),
                ("util", ComponentRole::Libraries),
            ]
        );
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].origin.ends_with("broken.jar"));
        assert_eq!(group.class_count(), 2);
        assert_eq!(group.providers("util.Money"), vec!["util"]);

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn missing_root_is_a_failure_not_an_abort() {
        let base = temp_dir("class-metrics-load-missing");
        let classes = base.join("classes");
        fs::create_dir_all(classes.join("shop")).unwrap();
        fs::write(
            classes.join("shop/Cart.class"),
            ClassFileBuilder::new("shop/Cart").build(),
        )
        .unwrap();
        let gone = base.join("gone");

        let roots = ProjectRoots {
            sources: vec![classes],
            required: vec![gone.clone()],
            ..ProjectRoots::default()
        };
        let (group, report) = load_group("shop", &roots).unwrap();

        assert_eq!(group.class_count(), 1);
        assert_eq!(report.components.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].origin, gone.display().to_string());
        assert!(report.failures[0].reason.contains("does not exist"));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn clashing_component_names_get_suffixes() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name(&mut taken, "util".to_string()), "util");
        assert_eq!(unique_name(&mut taken, "util".to_string()), "util~2");
        assert_eq!(unique_name(&mut taken, "util".to_string()), "util~3");
    }
}
