//! Script stage.
//!
//! Per script: read → preprocess → lint → `templateUrl` rewrite → annotate
//! → minify → wrap. A missing or unreadable script contributes nothing; an
//! annotation error is fatal for the stage and stops minification of every
//! script processed after it.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::asset::minify::{is_minified, minify_js};
use crate::lint::{LintMessage, LintReport, report};
use crate::transform::{annotate, preprocess, rewrite_template_urls, wrap_scope};
use crate::utils::plural_count;
use crate::{debug, log};

use super::{BuildContext, has_violations, run_ordered};

/// File name of the generated template registry; never linted.
pub const REGISTRY_FILE: &str = "templates.js";

const REPORT_NAME: &str = "scripts";

enum ScriptOutcome {
    Ready(String),
    Failed,
    Fatal(String),
}

struct ScriptResult {
    relative: String,
    messages: Vec<LintMessage>,
    outcome: ScriptOutcome,
}

impl ScriptResult {
    fn failed(relative: String) -> Self {
        Self {
            relative,
            messages: Vec::new(),
            outcome: ScriptOutcome::Failed,
        }
    }
}

/// Process every referenced script and concatenate them in reference order.
///
/// The error string names why the stage failed.
pub async fn process_scripts(ctx: &BuildContext, scripts: &[String]) -> Result<String, String> {
    let fatal = Arc::new(AtomicBool::new(false));

    let results = run_ordered(scripts.iter().cloned(), |_, reference| {
        let ctx = ctx.clone();
        let fatal = Arc::clone(&fatal);
        async move { process_script(&ctx, reference, &fatal).await }
    })
    .await
    .map_err(|e| format!("script task failed: {e}"))?;

    let mut report = LintReport::new();
    let mut bodies = Vec::with_capacity(results.len());
    let mut fatal_errors = Vec::new();
    let mut violations = 0;

    for result in results {
        if has_violations(&result.messages) {
            violations += 1;
        }
        report.push(&result.relative, result.messages);
        match result.outcome {
            ScriptOutcome::Ready(code) => bodies.push(code),
            ScriptOutcome::Failed => {}
            ScriptOutcome::Fatal(reason) => fatal_errors.push(reason),
        }
    }

    let options = &ctx.config.options;
    if options.extended_report {
        report::publish(&ctx.config.paths.logs, REPORT_NAME, &report);
    }

    if !fatal_errors.is_empty() {
        return Err(format!("annotation failed: {}", fatal_errors.join("; ")));
    }
    if violations > 0 && options.fail_on_lint() {
        return Err(format!("lint errors in {}", plural_count(violations, "script")));
    }

    debug!("scripts"; "bundled {}", plural_count(bodies.len(), "script"));
    Ok(bodies.join("\n"))
}

async fn process_script(ctx: &BuildContext, reference: String, fatal: &AtomicBool) -> ScriptResult {
    let config = &ctx.config;
    let options = &config.options;

    let Some(mapped) = ctx.mapper().map(&reference) else {
        log!("warn"; "script {} is not under the source root, skipped", reference);
        return ScriptResult::failed(reference);
    };
    let relative = mapped.relative;

    let source = match tokio::fs::read_to_string(&mapped.origin).await {
        Ok(source) => source,
        Err(e) => {
            log!("error"; "cannot read script {}: {}", relative, e);
            return ScriptResult::failed(relative);
        }
    };

    let source = if options.preprocess_resources {
        match preprocess(&source, config.preprocess_context()) {
            Ok(source) => source,
            Err(e) => {
                log!("error"; "{}: {}", relative, e);
                return ScriptResult::failed(relative);
            }
        }
    } else {
        source
    };

    let messages = if is_registry(&relative) {
        Vec::new()
    } else {
        ctx.lint(ctx.script_linter.as_ref(), &relative, &source)
    };

    let code = rewrite_template_urls(&source);

    let code = match annotate(&code) {
        Ok(code) => code,
        Err(e) => {
            fatal.store(true, Ordering::SeqCst);
            log!("error"; "{}: {}", relative, e);
            return ScriptResult {
                outcome: ScriptOutcome::Fatal(format!("{relative}: {e}")),
                relative,
                messages,
            };
        }
    };

    let compress = !options.skip_resource_compression
        && !fatal.load(Ordering::SeqCst)
        && !is_minified(&mapped.origin);
    let code = if compress {
        minify_js(&code).unwrap_or_else(|| {
            log!("warn"; "{} could not be minified, kept as is", relative);
            code
        })
    } else {
        code
    };

    ScriptResult {
        outcome: ScriptOutcome::Ready(wrap_scope(&code)),
        relative,
        messages,
    }
}

fn is_registry(relative: &str) -> bool {
    Path::new(relative)
        .file_name()
        .is_some_and(|name| name == REGISTRY_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, RawFlags};
    use std::fs;
    use tempfile::TempDir;

    fn project(flags: RawFlags, files: &[(&str, &str)]) -> (TempDir, BuildContext) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let path = dir.path().join("src").join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let config = BuildConfig::new(dir.path(), dir.path(), &flags);
        (dir, BuildContext::new(config))
    }

    fn refs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_bundle_in_reference_order() {
        let (_dir, ctx) = project(
            RawFlags::default(),
            &[("js/a.js", "var a = 1;"), ("js/b.js", "var b = 2;")],
        );
        let out = process_scripts(&ctx, &refs(&["js/b.js", "js/a.js"])).await.unwrap();
        assert_eq!(out, "(function () {\nvar b = 2;\n})();\n(function () {\nvar a = 1;\n})();");
    }

    #[tokio::test]
    async fn test_missing_script_contributes_nothing() {
        let (_dir, ctx) = project(RawFlags::default(), &[("js/a.js", "var a = 1;")]);
        let out = process_scripts(&ctx, &refs(&["js/missing.js", "js/a.js"])).await.unwrap();
        assert_eq!(out, "(function () {\nvar a = 1;\n})();");
    }

    #[tokio::test]
    async fn test_template_url_and_annotation() {
        let (_dir, ctx) = project(
            RawFlags::default(),
            &[(
                "js/app.js",
                "angular.module('app').directive('card', function ($timeout) {\n  return {\n    templateUrl: 'templates/card.html',\n    restrict: 'E'\n  };\n});",
            )],
        );
        let out = process_scripts(&ctx, &refs(&["js/app.js"])).await.unwrap();
        assert!(out.contains("directive('card', ['$timeout', function ($timeout)"));
        assert!(out.contains("template: function () { return window.__templateCache['templates/card.html']; },"));
    }

    #[tokio::test]
    async fn test_annotation_error_fails_stage() {
        let (_dir, ctx) = project(
            RawFlags::default(),
            &[
                ("js/a.js", "var a = 1;"),
                ("js/bad.js", "m.controller('X', function ($scope) {\n  if (a) {\n"),
            ],
        );
        let err = process_scripts(&ctx, &refs(&["js/a.js", "js/bad.js"])).await.unwrap_err();
        assert!(err.starts_with("annotation failed: js/bad.js"));
    }

    #[tokio::test]
    async fn test_lint_errors_fail_unless_allowed() {
        let files = [("js/a.js", "with (obj) {\n  x = 1;\n}\n")];
        let (_dir, ctx) = project(RawFlags::default(), &files);
        let err = process_scripts(&ctx, &refs(&["js/a.js"])).await.unwrap_err();
        assert_eq!(err, "lint errors in 1 script");

        let (_dir, ctx) = project(
            RawFlags {
                no_fail_lint: Some(true),
                ..RawFlags::default()
            },
            &files,
        );
        assert!(process_scripts(&ctx, &refs(&["js/a.js"])).await.is_ok());
    }

    #[tokio::test]
    async fn test_vendored_scripts_not_linted() {
        let (_dir, ctx) = project(
            RawFlags::default(),
            &[("lib/legacy/legacy.js", "with (window) { x = 1; }")],
        );
        assert!(process_scripts(&ctx, &refs(&["lib/legacy/legacy.js"])).await.is_ok());
    }

    #[tokio::test]
    async fn test_vendored_scripts_annotated() {
        let (_dir, ctx) = project(
            RawFlags::default(),
            &[(
                "lib/widget/widget.js",
                "angular.module('widget', []).directive('widget', function ($compile) {\n  return {};\n});",
            )],
        );
        let out = process_scripts(&ctx, &refs(&["lib/widget/widget.js"])).await.unwrap();
        assert!(out.contains("directive('widget', ['$compile', function ($compile)"));
    }

    #[tokio::test]
    async fn test_array_filter_does_not_fail_stage() {
        let (_dir, ctx) = project(
            RawFlags {
                production: Some(true),
                ..RawFlags::default()
            },
            &[(
                "js/app.js",
                "window.evens = [1, 2, 3].filter(function (n) {\n  return n % 2 === 0;\n});\n",
            )],
        );
        let out = process_scripts(&ctx, &refs(&["js/app.js"])).await.unwrap();
        assert!(out.contains("window.evens"));
    }

    #[tokio::test]
    async fn test_production_minifies() {
        let (_dir, ctx) = project(
            RawFlags {
                production: Some(true),
                ..RawFlags::default()
            },
            &[
                ("js/a.js", "var longName = 1;\nfunction add ( x, y ) {\n  return x + y;\n}\n"),
                ("lib/x/x.min.js", "var   kept = 1;"),
            ],
        );
        let out = process_scripts(&ctx, &refs(&["js/a.js", "lib/x/x.min.js"])).await.unwrap();
        assert!(!out.contains("function add ( x, y )"));
        assert!(out.contains("var   kept = 1;"));
    }

    #[tokio::test]
    async fn test_preprocess_resources() {
        let (_dir, ctx) = project(
            RawFlags {
                production: Some(true),
                skip_comp: Some(true),
                preprocess_resources: Some(true),
                ..RawFlags::default()
            },
            &[("js/a.js", "// @ifdef DEBUG\nconsole.log('dbg');\n// @endif\nvar env = '/* @echo NODE_ENV */';\n")],
        );
        let out = process_scripts(&ctx, &refs(&["js/a.js"])).await.unwrap();
        assert!(!out.contains("dbg"));
        assert!(out.contains("var env = 'production';"));
    }

    #[test]
    fn test_is_registry() {
        assert!(is_registry("js/templates.js"));
        assert!(!is_registry("js/app.js"));
    }
}
