//! Expanding user inputs into a list of source files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{LoadError, LoadResult};

use super::source::SourceFormat;

/// Expand each input into source files.
///
/// - a directory is walked recursively and every file with a supported extension (`.csv`,
///   `.json`, `.jsonl`, `.ndjson`, optionally followed by `.gz`) is kept, sorted by path;
/// - an input containing `*`, `?` or `[` is treated as a glob pattern;
/// - anything else is taken as a file path as-is, so a missing file fails later when opened.
///
/// Duplicates are removed, keeping the first occurrence.
pub fn discover_sources<S: AsRef<str>>(inputs: &[S]) -> LoadResult<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let path = Path::new(input);
        let found = if path.is_dir() {
            walk_dir(path)?
        } else if input.contains(['*', '?', '[']) {
            expand_glob(input)?
        } else {
            vec![path.to_path_buf()]
        };
        for p in found {
            if !out.contains(&p) {
                out.push(p);
            }
        }
    }
    tracing::debug!(inputs = inputs.len(), files = out.len(), "discovered sources");
    Ok(out)
}

fn walk_dir(root: &Path) -> LoadResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            LoadError::open(path, e.into())
        })?;
        if entry.file_type().is_file() && SourceFormat::from_path(entry.path()).is_ok() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn expand_glob(pattern: &str) -> LoadResult<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| LoadError::config(format!("invalid glob pattern '{pattern}': {e}")))?;
    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            LoadError::open(path, e.into())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}
