//! Build options merged from raw invocation flags.
//!
//! Raw flags arrive as `Option`s so an explicit `false` can be told apart
//! from "not given". Merging is first-non-`None`-wins over the recognised
//! flag set; nothing else is inferred.

use super::PreprocessContext;

/// Default name of the staging directory under `tmp/`.
pub const DEFAULT_DESTINATION_DIR: &str = "build";

/// Target environment of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

/// Flags as supplied by the invoking hook or the command line.
#[derive(Debug, Clone, Default)]
pub struct RawFlags {
    pub production: Option<bool>,
    pub debug: Option<bool>,
    pub angular_debug: Option<bool>,
    pub skip_lint: Option<bool>,
    pub no_fail_lint: Option<bool>,
    pub skip_comp: Option<bool>,
    pub skip_html_compression: Option<bool>,
    pub skip_res_compression: Option<bool>,
    pub verbose: Option<bool>,
    pub extended_report: Option<bool>,
    pub skip_all: Option<bool>,
    pub preprocess_resources: Option<bool>,
    pub dest: Option<String>,
}

/// Immutable options for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub production: bool,
    pub debug: bool,
    pub angular_debug: bool,
    pub skip_lint: bool,
    pub no_fail_lint: bool,
    pub skip_compression: bool,
    pub skip_html_compression: bool,
    pub skip_resource_compression: bool,
    pub verbose: bool,
    pub extended_report: bool,
    pub preprocess_resources: bool,
    pub destination_dir_name: String,
    pub environment: Environment,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_flags(&RawFlags::default())
    }
}

impl BuildOptions {
    /// Merge raw flags into options and compute derived fields.
    ///
    /// `skip_compression` defaults to `!production`; an explicit flag wins.
    /// `--skip-all` stands in for both `--skip-lint` and `--skip-comp` when
    /// those are not given.
    pub fn from_flags(raw: &RawFlags) -> Self {
        let production = raw.production.unwrap_or(false);
        let skip_all = raw.skip_all;

        let skip_lint = raw.skip_lint.or(skip_all).unwrap_or(false);
        let skip_compression = raw.skip_comp.or(skip_all).unwrap_or(!production);

        Self {
            production,
            debug: raw.debug.unwrap_or(false),
            angular_debug: raw.angular_debug.unwrap_or(false),
            skip_lint,
            no_fail_lint: raw.no_fail_lint.unwrap_or(false),
            skip_compression,
            skip_html_compression: raw.skip_html_compression.unwrap_or(skip_compression),
            skip_resource_compression: raw.skip_res_compression.unwrap_or(skip_compression),
            verbose: raw.verbose.unwrap_or(false),
            extended_report: raw.extended_report.unwrap_or(false),
            preprocess_resources: raw.preprocess_resources.unwrap_or(false),
            destination_dir_name: raw
                .dest
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DESTINATION_DIR.to_string()),
            environment: if production {
                Environment::Production
            } else {
                Environment::Development
            },
        }
    }

    /// Lint violations reject their stage unless `--no-fail-lint` is set.
    #[inline]
    pub const fn fail_on_lint(&self) -> bool {
        !self.no_fail_lint
    }

    /// Symbols handed to the directive preprocessor.
    pub fn preprocess_context(&self) -> PreprocessContext {
        PreprocessContext::from_options(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> RawFlags {
        RawFlags::default()
    }

    #[test]
    fn test_development_defaults() {
        let opts = BuildOptions::from_flags(&flags());
        assert!(!opts.production);
        assert_eq!(opts.environment, Environment::Development);
        assert!(opts.skip_compression);
        assert!(opts.skip_html_compression);
        assert!(opts.skip_resource_compression);
        assert!(opts.fail_on_lint());
        assert_eq!(opts.destination_dir_name, "build");
    }

    #[test]
    fn test_production_compresses_by_default() {
        let opts = BuildOptions::from_flags(&RawFlags {
            production: Some(true),
            ..flags()
        });
        assert_eq!(opts.environment, Environment::Production);
        assert!(!opts.skip_compression);
        assert!(!opts.skip_resource_compression);
    }

    #[test]
    fn test_explicit_skip_wins_in_each_mode() {
        let prod_skip = BuildOptions::from_flags(&RawFlags {
            production: Some(true),
            skip_comp: Some(true),
            ..flags()
        });
        assert!(prod_skip.skip_compression);

        let dev_compress = BuildOptions::from_flags(&RawFlags {
            skip_comp: Some(false),
            ..flags()
        });
        assert!(!dev_compress.skip_compression);
    }

    #[test]
    fn test_individual_compression_overrides() {
        let opts = BuildOptions::from_flags(&RawFlags {
            production: Some(true),
            skip_html_compression: Some(true),
            ..flags()
        });
        assert!(!opts.skip_compression);
        assert!(opts.skip_html_compression);
        assert!(!opts.skip_resource_compression);
    }

    #[test]
    fn test_skip_all() {
        let opts = BuildOptions::from_flags(&RawFlags {
            production: Some(true),
            skip_all: Some(true),
            ..flags()
        });
        assert!(opts.skip_lint);
        assert!(opts.skip_compression);

        // explicit flags take precedence over skip-all
        let opts = BuildOptions::from_flags(&RawFlags {
            skip_all: Some(true),
            skip_lint: Some(false),
            ..flags()
        });
        assert!(!opts.skip_lint);
    }

    #[test]
    fn test_dest_override() {
        let opts = BuildOptions::from_flags(&RawFlags {
            dest: Some("bundle".into()),
            ..flags()
        });
        assert_eq!(opts.destination_dir_name, "bundle");

        let blank = BuildOptions::from_flags(&RawFlags {
            dest: Some("  ".into()),
            ..flags()
        });
        assert_eq!(blank.destination_dir_name, DEFAULT_DESTINATION_DIR);
    }
}
