//! Lifecycle hook entry.
//!
//! The host tool runs us before it packages or serves the app. Its command
//! line decides which orchestrator runs.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::{BuildConfig, RawFlags};
use crate::debug;

/// Tokens of the host command line that select serve mode.
const SERVE_TOKENS: &[&str] = &["serve", "--watch", "-w"];

/// What the invoking hook hands over.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub project_root: PathBuf,
    pub flags: RawFlags,
    pub plugin_dir: PathBuf,
    pub command_line: String,
}

/// Which orchestrator a hook invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Build,
    Serve,
}

impl Mode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Serve => "serve",
        }
    }
}

/// Serve when the command line asks for `serve` or a watch flag.
pub fn select_mode(command_line: &str) -> Mode {
    if command_line
        .split_whitespace()
        .any(|token| SERVE_TOKENS.contains(&token))
    {
        Mode::Serve
    } else {
        Mode::Build
    }
}

impl InvocationContext {
    pub fn mode(&self) -> Mode {
        select_mode(&self.command_line)
    }

    pub fn config(&self) -> BuildConfig {
        BuildConfig::new(&self.project_root, &self.plugin_dir, &self.flags)
    }
}

/// Run the orchestrator the invocation asks for.
pub async fn run_hook(invocation: InvocationContext) -> Result<()> {
    let mode = invocation.mode();
    debug!("hook"; "`{}` -> {}", invocation.command_line, mode.label());

    let config = invocation.config();
    match mode {
        Mode::Build => super::build::build_project(config).await.map(|_| ()),
        Mode::Serve => super::serve::serve_project(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_mode() {
        assert_eq!(select_mode("ionic serve --lab"), Mode::Serve);
        assert_eq!(select_mode("cordova run android --watch"), Mode::Serve);
        assert_eq!(select_mode("ionic run ios -w"), Mode::Serve);
        assert_eq!(select_mode("ionic build android --prod"), Mode::Build);
        assert_eq!(select_mode("ionic run --server-url x"), Mode::Build);
        assert_eq!(select_mode(""), Mode::Build);
    }

    #[test]
    fn test_invocation_config() {
        let invocation = InvocationContext {
            project_root: PathBuf::from("/app"),
            flags: RawFlags {
                production: Some(true),
                ..RawFlags::default()
            },
            plugin_dir: PathBuf::from("/app/plugins/ionpack"),
            command_line: "ionic build".into(),
        };
        let config = invocation.config();
        assert!(config.options.production);
        assert_eq!(config.paths.marker, PathBuf::from("/app/plugins/ionpack/is-serving.tmp"));
        assert_eq!(invocation.mode(), Mode::Build);
    }
}
