//! Asset processing pipeline.
//!
//! # Stages
//!
//! ```text
//! templates ──► extract entry ──┬─► scripts ──┐
//!                               ├─► styles  ──┼─► assemble
//!                               └─► copy    ──┘
//! ```
//!
//! - `templates`: template registry script from every `.html` under `src`
//! - `extract`: ordered references + normalized entry markup
//! - `scripts` / `styles`: per-file transforms, concatenated in markup order
//! - `assemble`: entry rewrite and final artifact writes
//!
//! Per-file work is spawned on a `JoinSet` and put back in reference order
//! before concatenation.

pub mod assemble;
mod extract;
mod scripts;
mod styles;
mod templates;

pub use extract::{ExtractError, extract_resources, scan_references};
pub use scripts::process_scripts;
pub use styles::process_styles;
pub use templates::build_template_registry;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};

use crate::asset::PathMapper;
use crate::config::BuildConfig;
use crate::lint::{LintMessage, Linter, MarkupLinter, ScriptLinter, log_messages};

/// Shared, read-only state for one pipeline run.
#[derive(Clone)]
pub struct BuildContext {
    pub config: Arc<BuildConfig>,
    pub script_linter: Arc<dyn Linter>,
    pub markup_linter: Arc<dyn Linter>,
}

impl BuildContext {
    /// Context with the default linters.
    pub fn new(config: BuildConfig) -> Self {
        Self::with_linters(config, Arc::new(ScriptLinter), Arc::new(MarkupLinter))
    }

    pub fn with_linters(
        config: BuildConfig,
        script_linter: Arc<dyn Linter>,
        markup_linter: Arc<dyn Linter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            script_linter,
            markup_linter,
        }
    }

    /// Maps references from `src` into the staging directory.
    pub fn mapper(&self) -> PathMapper {
        let paths = &self.config.paths;
        PathMapper::new(&paths.src, &paths.staging)
    }

    /// Lint `source` with `linter` unless the file is exempt, logging findings.
    pub(crate) fn lint(
        &self,
        linter: &dyn Linter,
        relative: &str,
        source: &str,
    ) -> Vec<LintMessage> {
        if self.config.skips_lint(relative) {
            return Vec::new();
        }
        let messages = linter.lint(source);
        log_messages(Path::new(relative), &messages);
        messages
    }
}

/// Whether a file's lint messages fail it under fail-on-lint.
///
/// Any message counts, warnings included.
#[inline]
pub(crate) fn has_violations(messages: &[LintMessage]) -> bool {
    !messages.is_empty()
}

/// Run `task` for every item concurrently; results come back in item order.
pub(crate) async fn run_ordered<I, T, F, Fut>(items: I, task: F) -> Result<Vec<T>, JoinError>
where
    I: IntoIterator,
    F: Fn(usize, I::Item) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut set = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let fut = task(index, item);
        set.spawn(async move { (index, fut.await) });
    }

    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        results.push(joined?);
    }
    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, value)| value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_ordered_restores_order() {
        let delays = vec![30u64, 0, 10];
        let out = run_ordered(delays, |index, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            index
        })
        .await
        .unwrap();
        assert_eq!(out, vec![0, 1, 2]);
    }

    #[test]
    fn test_has_violations() {
        let warn = LintMessage::warning("no-debugger", (1, 1), "x");
        let err = LintMessage::error("syntax", (1, 1), "y");
        assert!(!has_violations(&[]));
        assert!(has_violations(std::slice::from_ref(&warn)));
        assert!(has_violations(&[warn, err]));
    }
}
