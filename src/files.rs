use std::path::{Path, PathBuf};

use tracing::debug;

/// Expand command line paths into the list of files to analyze.
///
/// Directories are walked respecting `.gitignore` and contribute their
/// `*.py` files in sorted order. Anything else is kept as given, whatever
/// its extension, so a missing file is reported by the analysis itself.
pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = walk_python_files(path);
            debug!(dir = %path.display(), files = found.len(), "expanded directory");
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn walk_python_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("py") {
            files.push(path.to_path_buf());
        }
    }
    files
}
