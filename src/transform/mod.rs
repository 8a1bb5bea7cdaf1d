//! Source-to-source rewrites used by the script and template stages.
//!
//! - [`preprocess`]: `@if`/`@ifdef`/`@echo` directive evaluation
//! - [`annotate`]: array-annotated dependency injection
//! - [`rewrite_template_urls`]: `templateUrl:` to template-cache lookups
//! - [`wrap_scope`]: isolated invocation scope around a bundle part

mod annotate;
mod preprocess;

pub use annotate::annotate;
pub use preprocess::{PreprocessError, preprocess};

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Global object the template registry fills at startup.
pub const TEMPLATE_CACHE_GLOBAL: &str = "window.__templateCache";

// NOTE: textual on purpose; the expression runs to the next comma or newline,
// so a `templateUrl` followed by another property on the same line is not
// supported.
static TEMPLATE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"templateUrl\s*:\s*([^,\n]+)").unwrap());

/// Replace `templateUrl: <expr>` with a template-cache lookup of `<expr>`.
pub fn rewrite_template_urls(source: &str) -> String {
    TEMPLATE_URL
        .replace_all(source, |caps: &Captures| {
            format!(
                "template: function () {{ return {TEMPLATE_CACHE_GLOBAL}[{}]; }}",
                caps[1].trim_end()
            )
        })
        .into_owned()
}

/// Wrap code in an immediately invoked function so its top-level
/// declarations stay out of the shared bundle scope.
pub fn wrap_scope(code: &str) -> String {
    format!("(function () {{\n{}\n}})();", code.trim_end())
}
