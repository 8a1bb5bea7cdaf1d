//! Template registry builder.
//!
//! Every `.html` file under `src` except the entry document becomes one
//! entry of `window.__templateCache`, keyed by its source-relative path.
//! Scripts and stylesheets a template references are copied to staging.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::asset::{PathFilter, collect_with_extension, copy_resources, minify};
use crate::error::BuildError;
use crate::lint::{LintMessage, LintReport, report};
use crate::transform::{TEMPLATE_CACHE_GLOBAL, preprocess};
use crate::utils::plural_count;
use crate::{debug, log};

use super::{BuildContext, has_violations, run_ordered, scan_references};

/// Name of the lint report for this stage.
const REPORT_NAME: &str = "templates";

/// The generated registry script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRegistry {
    pub body: String,
    /// Templates included in `body`
    pub count: usize,
    /// No template produced a lint message
    pub clean: bool,
    /// Side resources copied to staging
    pub copied: usize,
}

enum TemplateOutcome {
    Included { key: String, markup: String },
    Rejected { key: String },
}

struct TemplateResult {
    path: PathBuf,
    messages: Vec<LintMessage>,
    outcome: TemplateOutcome,
    copied: usize,
}

/// Build the registry script for every template under the source root.
///
/// With fail-on-lint, any template with lint messages rejects the whole stage
/// after all templates have been checked.
pub async fn build_template_registry(ctx: &BuildContext) -> Result<TemplateRegistry, BuildError> {
    let paths = &ctx.config.paths;
    let templates: Vec<PathBuf> = collect_with_extension(&paths.src, "html")
        .into_iter()
        .filter(|p| *p != paths.entry)
        .collect();
    debug!("templates"; "found {}", plural_count(templates.len(), "template"));

    let results = run_ordered(templates, |_, path| {
        let ctx = ctx.clone();
        async move { process_template(&ctx, path).await }
    })
    .await
    .map_err(anyhow::Error::from)?;

    let mut report = LintReport::new();
    let mut entries = Vec::new();
    let mut rejected = Vec::new();
    let mut clean = true;
    let mut copied = 0;

    for result in results {
        let result = result?;
        copied += result.copied;
        if has_violations(&result.messages) {
            clean = false;
        }
        report.push(result.path, result.messages);
        match result.outcome {
            TemplateOutcome::Included { key, markup } => entries.push((key, markup)),
            TemplateOutcome::Rejected { key } => rejected.push(key),
        }
    }

    if ctx.config.options.extended_report {
        report::publish(&paths.logs, REPORT_NAME, &report);
    }

    if !rejected.is_empty() {
        return Err(BuildError::TemplateLint(rejected.join(", ")));
    }

    Ok(TemplateRegistry {
        count: entries.len(),
        body: registry_script(&entries),
        clean,
        copied,
    })
}

async fn process_template(ctx: &BuildContext, path: PathBuf) -> Result<TemplateResult, BuildError> {
    let config = &ctx.config;
    let key = config
        .paths
        .src_relative(&path)
        .unwrap_or_else(|| path.display().to_string());

    let source = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| BuildError::Io(path.clone(), e))?;

    let messages = ctx.lint(ctx.markup_linter.as_ref(), &key, &source);
    if has_violations(&messages) && config.options.fail_on_lint() {
        return Ok(TemplateResult {
            path,
            messages,
            outcome: TemplateOutcome::Rejected { key },
            copied: 0,
        });
    }

    let copied = copy_side_resources(ctx, &source).await?;

    let markup = preprocess(&source, config.preprocess_context())
        .map_err(|e| BuildError::Preprocess(key.clone(), e))?;
    let markup = if config.options.skip_html_compression {
        markup
    } else {
        minify::minify_html(&markup)
    };

    Ok(TemplateResult {
        path,
        messages,
        outcome: TemplateOutcome::Included { key, markup },
        copied,
    })
}

/// Copy scripts and stylesheets a template references into staging.
async fn copy_side_resources(ctx: &BuildContext, source: &str) -> Result<usize, BuildError> {
    let references = match scan_references(source) {
        Ok(list) => list,
        Err(e) => {
            log!("warn"; "cannot scan template references: {}", e);
            return Ok(0);
        }
    };
    if references.is_empty() {
        return Ok(0);
    }

    let mapper = ctx.mapper();
    let files = references
        .scripts
        .iter()
        .chain(&references.links)
        .filter_map(|r| mapper.map(r))
        .collect();
    Ok(copy_resources(files, &PathFilter::All).await?)
}

/// Registry script: fills the global cache, then hands it to `$templateCache`.
fn registry_script(entries: &[(String, String)]) -> String {
    let mut body = String::with_capacity(entries.iter().map(|(_, m)| m.len() + 64).sum());
    let _ = writeln!(body, "{TEMPLATE_CACHE_GLOBAL} = {TEMPLATE_CACHE_GLOBAL} || {{}};");
    for (key, markup) in entries {
        let _ = writeln!(
            body,
            "{TEMPLATE_CACHE_GLOBAL}[{}] = {};",
            js_string(key),
            js_string(markup)
        );
    }
    let _ = write!(
        body,
        "if (window.angular) {{\n  \
         angular.module('templates', []).run(['$templateCache', function ($templateCache) {{\n    \
         Object.keys({TEMPLATE_CACHE_GLOBAL}).forEach(function (key) {{\n      \
         $templateCache.put(key, {TEMPLATE_CACHE_GLOBAL}[key]);\n    \
         }});\n  \
         }}]);\n\
         }}\n"
    );
    body
}

/// JSON string literal that is also safe inside an inline `<script>`.
fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
        .replace("</script", "<\\/script")
}
