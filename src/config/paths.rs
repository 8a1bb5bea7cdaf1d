//! Project filesystem layout.

use std::path::{Path, PathBuf};

/// Source directory name under the project root.
pub const SRC_DIR: &str = "src";
/// Temporary build root, wiped at the start of every build.
pub const TMP_DIR: &str = "tmp";
/// Final publish directory consumed by the packaging tool.
pub const WWW_DIR: &str = "www";
/// Extended lint reports are written here.
pub const LOGS_DIR: &str = "logs";
/// Entry document, relative to the source root.
pub const ENTRY_FILE: &str = "index.html";
/// Presence marks an active serve session.
pub const MARKER_FILE: &str = "is-serving.tmp";

/// Resolved paths for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub src: PathBuf,
    pub tmp: PathBuf,
    /// Staging directory inside `tmp` where a build assembles its output.
    pub staging: PathBuf,
    pub www: PathBuf,
    pub logs: PathBuf,
    pub entry: PathBuf,
    pub marker: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: &Path, plugin_dir: &Path, staging_name: &str) -> Self {
        let src = root.join(SRC_DIR);
        let tmp = root.join(TMP_DIR);
        Self {
            root: root.to_path_buf(),
            entry: src.join(ENTRY_FILE),
            staging: tmp.join(staging_name),
            www: root.join(WWW_DIR),
            logs: root.join(LOGS_DIR),
            marker: plugin_dir.join(MARKER_FILE),
            src,
            tmp,
        }
    }

    /// Source-relative path with forward slashes, if `path` is under `src`.
    pub fn src_relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.src).ok()?;
        Some(
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }
}
