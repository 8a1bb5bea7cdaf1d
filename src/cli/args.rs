//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RawFlags;

/// Asset build pipeline for hybrid mobile apps
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Project root containing `src/`
    #[arg(long, global = true, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    pub root: PathBuf,

    /// Directory holding the serve marker (default: <root>/.ionpack)
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub plugin_dir: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn plugin_dir(&self) -> PathBuf {
        self.plugin_dir
            .clone()
            .unwrap_or_else(|| self.root.join(".ionpack"))
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build `src/` into `www/`
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Mirror `src/` into `www/` and keep it in sync
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Lifecycle hook entry: picks build or serve from the host command line
    Hook {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Command line of the invoking tool (e.g. `ionic serve --lab`)
        #[arg(
            value_name = "COMMAND_LINE",
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command_line: Vec<String>,
    },
}

impl Commands {
    pub fn build_args(&self) -> &BuildArgs {
        match self {
            Self::Build { build_args } | Self::Serve { build_args } | Self::Hook { build_args, .. } => {
                build_args
            }
        }
    }
}

/// Shared pipeline flags for every subcommand
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Production build: compression on, debug blocks off
    #[arg(short, long, visible_alias = "prod", action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub production: Option<bool>,

    /// Toggle `DEBUG` preprocessor blocks
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub debug: Option<bool>,

    /// Toggle `ANGULAR_DEBUG` preprocessor blocks
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub angular_debug: Option<bool>,

    /// Skip linting of scripts and templates
    #[arg(short = 'l', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub skip_lint: Option<bool>,

    /// Report lint errors without failing the build
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub no_fail_lint: Option<bool>,

    /// Skip compression (default: on in development, off in production)
    #[arg(short = 'c', long = "skip-comp", action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub skip_comp: Option<bool>,

    /// Skip HTML compression only
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub skip_html_compression: Option<bool>,

    /// Skip script and stylesheet compression only
    #[arg(long = "skip-res-compression", action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub skip_res_compression: Option<bool>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub verbose: Option<bool>,

    /// Write and open an HTML lint report under `logs/`
    #[arg(short = 'r', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub extended_report: Option<bool>,

    /// Skip both linting and compression
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub skip_all: Option<bool>,

    /// Run the directive preprocessor on scripts and stylesheets
    #[arg(short = 'P', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub preprocess_resources: Option<bool>,

    /// Staging directory name under `tmp/`
    #[arg(long, value_name = "NAME")]
    pub dest: Option<String>,
}

impl BuildArgs {
    pub fn raw_flags(&self) -> RawFlags {
        RawFlags {
            production: self.production,
            debug: self.debug,
            angular_debug: self.angular_debug,
            skip_lint: self.skip_lint,
            no_fail_lint: self.no_fail_lint,
            skip_comp: self.skip_comp,
            skip_html_compression: self.skip_html_compression,
            skip_res_compression: self.skip_res_compression,
            verbose: self.verbose,
            extended_report: self.extended_report,
            skip_all: self.skip_all,
            preprocess_resources: self.preprocess_resources,
            dest: self.dest.clone(),
        }
    }
}
