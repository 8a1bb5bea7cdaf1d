//! Invocation configuration.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── options    # RawFlags → BuildOptions (merged once, then read-only)
//! ├── context    # PreprocessContext (NODE_ENV / DEBUG / ANGULAR_DEBUG)
//! ├── paths      # ProjectPaths (src, tmp, www, logs, marker)
//! ├── vendor     # VendorLayout from `.bowerrc`
//! └── mod.rs     # BuildConfig (this file)
//! ```
//!
//! A [`BuildConfig`] is built once per invocation and shared by reference
//! (or `Arc`) with every component. Nothing in it changes after creation.

mod context;
mod options;
mod paths;
mod vendor;

pub use context::PreprocessContext;
pub use options::{BuildOptions, RawFlags};
pub use paths::{ENTRY_FILE, ProjectPaths};
pub use vendor::VendorLayout;

use std::path::Path;

/// Everything a build or serve run needs to know, fixed at startup.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub options: BuildOptions,
    pub paths: ProjectPaths,
    pub vendor: VendorLayout,
    preprocess: PreprocessContext,
}

impl BuildConfig {
    /// Merge flags and resolve the project layout.
    pub fn new(root: &Path, plugin_dir: &Path, flags: &RawFlags) -> Self {
        let options = BuildOptions::from_flags(flags);
        let paths = ProjectPaths::new(root, plugin_dir, &options.destination_dir_name);
        let vendor = VendorLayout::load(root, &paths.src);
        Self::from_parts(options, paths, vendor)
    }

    pub fn from_parts(options: BuildOptions, paths: ProjectPaths, vendor: VendorLayout) -> Self {
        let preprocess = options.preprocess_context();
        Self {
            options,
            paths,
            vendor,
            preprocess,
        }
    }

    /// Symbols for the directive preprocessor.
    pub fn preprocess_context(&self) -> &PreprocessContext {
        &self.preprocess
    }

    /// Whether a file is exempt from linting.
    pub fn skips_lint(&self, relative: &str) -> bool {
        self.options.skip_lint || self.vendor.is_vendored(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::vendor::DEFAULT_VENDOR_DIR;

    #[test]
    fn test_build_config_from_flags() {
        let dir = tempfile::TempDir::new().unwrap();
        let flags = RawFlags {
            production: Some(true),
            dest: Some("stage".into()),
            ..RawFlags::default()
        };
        let config = BuildConfig::new(dir.path(), &dir.path().join("plugin"), &flags);

        assert!(config.options.production);
        assert_eq!(config.paths.staging, dir.path().join("tmp").join("stage"));
        assert_eq!(config.vendor.dir(), DEFAULT_VENDOR_DIR);
        assert_eq!(config.preprocess_context().get("NODE_ENV"), Some("production"));
    }

    #[test]
    fn test_skips_lint() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = BuildConfig::new(dir.path(), dir.path(), &RawFlags::default());
        assert!(config.skips_lint("lib/angular/angular.js"));
        assert!(!config.skips_lint("js/app.js"));

        let skip_all = BuildConfig::new(
            dir.path(),
            dir.path(),
            &RawFlags {
                skip_lint: Some(true),
                ..RawFlags::default()
            },
        );
        assert!(skip_all.skips_lint("js/app.js"));
    }
}
