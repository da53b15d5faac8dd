//! Session directory listing.

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::*;

/// Recursively lists files under `root` whose file name matches the glob
/// `pattern` (`*`, `?` and `[..]` as in shell globs), sorted by path.
///
/// A missing root yields an empty list, not an error.
pub fn find_files_matching<P: AsRef<Path>>(root: P, pattern: &str) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let matcher = Pattern::new(pattern)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.matches(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Recursively lists files whose name ends with `extension`.
///
/// The leading dot is optional (`"rec"` and `".rec"` are the same) and the
/// extension may itself contain `*`, e.g. `".*h264"` also finds
/// continuation files such as `x.1.h264`.
pub fn find_files_with_extension<P: AsRef<Path>>(root: P, extension: &str) -> Result<Vec<PathBuf>> {
    let extension = if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    };
    find_files_matching(root, &format!("*{}", extension))
}
