//! Source tree enumeration.

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Collect every file below `dir`, sorted. Hidden entries are skipped.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Collect files below `dir` whose extension is `ext` (case-insensitive).
pub fn collect_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    collect_all_files(dir)
        .into_iter()
        .filter(|path| has_extension(path, ext))
        .collect()
}

/// Case-insensitive extension check.
#[inline]
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
