use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// Raw bytes of one compiled class and where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub origin: String,
    pub bytes: Vec<u8>,
}

pub fn read_class_file(path: &Path) -> Result<ClassEntry> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read class file: {}", path.display()))?;
    Ok(ClassEntry {
        origin: path.display().to_string(),
        bytes,
    })
}

/// Every `.class` entry of a jar, in archive order. Module and package
/// descriptors are skipped.
pub fn read_jar_classes(jar_path: &Path) -> Result<Vec<ClassEntry>> {
    let file = File::open(jar_path)
        .with_context(|| format!("Failed to open jar: {}", jar_path.display()))?;
    let mmap = unsafe {
        Mmap::map(&file).with_context(|| format!("Failed to mmap jar: {}", jar_path.display()))?
    };
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read zip structure: {}", jar_path.display()))?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read entry {i} of {}", jar_path.display()))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !name.ends_with(".class") || is_descriptor_class(&name) {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to inflate {name} in {}", jar_path.display()))?;
        entries.push(ClassEntry {
            origin: format!("{}!/{name}", jar_path.display()),
            bytes,
        });
    }
    Ok(entries)
}

fn is_descriptor_class(entry_name: &str) -> bool {
    let file_name = entry_name.rsplit('/').next().unwrap_or(entry_name);
    file_name == "module-info.class" || file_name == "package-info.class"
}
