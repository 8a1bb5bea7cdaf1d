//! Vendor directory layout read from `.bowerrc`.
//!
//! The vendor directory drives two things: the font path prefixes used by
//! the style rewrites, and the lint skip pattern for third-party code.

use std::fs;
use std::path::{Component, Path};

use serde::Deserialize;

use crate::debug;

/// Vendor directory used when `.bowerrc` is missing or unreadable.
pub const DEFAULT_VENDOR_DIR: &str = "lib";

/// Package-manager directories that are never linted.
const INSTALLED_DIRS: &[&str] = &["node_modules", "bower_components"];

#[derive(Debug, Deserialize)]
struct BowerRc {
    directory: Option<String>,
}

/// Where third-party packages live, relative to the source root.
#[derive(Debug, Clone)]
pub struct VendorLayout {
    dir: String,
}

impl Default for VendorLayout {
    fn default() -> Self {
        Self::new(DEFAULT_VENDOR_DIR)
    }
}

impl VendorLayout {
    pub fn new(dir: &str) -> Self {
        Self {
            dir: dir.trim_matches('/').to_string(),
        }
    }

    /// Read `<root>/.bowerrc`, falling back to [`DEFAULT_VENDOR_DIR`].
    ///
    /// The declared directory is usually relative to the project root
    /// (`src/lib`); it is re-rooted below the source directory.
    pub fn load(project_root: &Path, src_root: &Path) -> Self {
        let path = project_root.join(".bowerrc");
        let declared = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str::<BowerRc>(&text).ok())
            .and_then(|rc| rc.directory);

        match declared {
            Some(dir) => {
                let relative = relative_to_src(&dir, project_root, src_root);
                debug!("config"; "vendor directory from .bowerrc: {}", relative);
                Self::new(&relative)
            }
            None => Self::default(),
        }
    }

    /// Vendor directory relative to the source root (`lib`).
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Whether a source-relative path belongs to vendored or installed code.
    pub fn is_vendored(&self, relative: &str) -> bool {
        let normalized = format!("/{}", relative.replace('\\', "/").trim_start_matches("./"));
        std::iter::once(self.dir.as_str())
            .chain(INSTALLED_DIRS.iter().copied())
            .any(|dir| normalized.contains(&format!("/{dir}/")))
    }

    /// Package-relative path to the ionicons font files.
    pub fn ionicons_fonts(&self) -> String {
        format!("{}/ionic/release/fonts/", self.dir)
    }

    /// Package-relative path to the font-awesome font files.
    pub fn font_awesome_fonts(&self) -> String {
        format!("{}/font-awesome/fonts/", self.dir)
    }
}

fn relative_to_src(declared: &str, project_root: &Path, src_root: &Path) -> String {
    let declared = Path::new(declared.trim());
    let absolute = if declared.is_absolute() {
        declared.to_path_buf()
    } else {
        project_root.join(declared)
    };

    if let Ok(rel) = absolute.strip_prefix(src_root) {
        return to_slash(rel);
    }

    // Declared outside the source root (e.g. `www/lib`): keep the tail
    let mut parts = declared
        .components()
        .filter(|c| matches!(c, Component::Normal(_)));
    let first = parts.next();
    let rest: Vec<_> = parts.collect();
    match (first, rest.is_empty()) {
        (Some(only), true) => only.as_os_str().to_string_lossy().into_owned(),
        (Some(_), false) => rest
            .iter()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        (None, _) => DEFAULT_VENDOR_DIR.to_string(),
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
