use anyhow::Result;
use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const JAVA_EXTENSION: &str = "java";

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

/// Expands the input paths into the list of source files to parse.
///
/// File arguments are kept as given, whatever their extension. Directories
/// are walked for `*.java` files, sorted per directory argument. Argument
/// order is preserved so later units win when class names collide.
pub fn collect_sources(paths: &[PathBuf], options: ScanOptions) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            out.extend(walk_java_files(path, options)?);
        } else if path.exists() {
            out.push(path.clone());
        } else {
            // Unreadable inputs are reported by the reader and skipped.
            tracing::warn!(path = %path.display(), "input path does not exist");
            out.push(path.clone());
        }
    }
    Ok(out)
}

fn walk_java_files(root: &Path, options: ScanOptions) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }

    let mut files = Vec::new();
    for entry in builder.hidden(false).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("scan error under {}: {err}", root.display());
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if path.extension().and_then(OsStr::to_str) == Some(JAVA_EXTENSION) {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        tracing::debug!(root = %root.display(), "no java sources found");
    }
    files.sort();
    Ok(files)
}
