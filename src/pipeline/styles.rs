//! Style stage.
//!
//! Bundled CSS is served from the output root, so relative font and image
//! paths written for nested stylesheets are rewritten to root-relative ones.
//! Per-file errors are logged and that file contributes nothing.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::asset::minify::{is_minified, minify_css};
use crate::config::VendorLayout;
use crate::transform::preprocess;
use crate::utils::plural_count;
use crate::{debug, log};

use super::{BuildContext, run_ordered};

static IONICONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\((['"]?)(?:\.\./)+fonts/ionicons"#).unwrap());
static FONT_AWESOME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\((['"]?)(?:\.\./)+fonts/fontawesome-webfont"#).unwrap()
});
static IMAGES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:\.\./)+img/").unwrap());
static FONTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:\.\./)+fonts/").unwrap());

/// Apply the four path rewrites, in order.
pub fn rewrite_style_paths(css: &str, vendor: &VendorLayout) -> String {
    let ionicons = vendor.ionicons_fonts();
    let font_awesome = vendor.font_awesome_fonts();

    let css = IONICONS.replace_all(css, |caps: &Captures| {
        format!("url({}{ionicons}ionicons", &caps[1])
    });
    let css = FONT_AWESOME.replace_all(&css, |caps: &Captures| {
        format!("url({}{font_awesome}fontawesome-webfont", &caps[1])
    });
    let css = IMAGES.replace_all(&css, "img/");
    FONTS.replace_all(&css, "fonts/").into_owned()
}

/// Process every referenced stylesheet and concatenate them in reference order.
///
/// Only a failed task fails the stage.
pub async fn process_styles(ctx: &BuildContext, links: &[String]) -> Result<String, String> {
    let bodies = run_ordered(links.iter().cloned(), |_, reference| {
        let ctx = ctx.clone();
        async move { process_style(&ctx, reference).await }
    })
    .await
    .map_err(|e| format!("style task failed: {e}"))?;

    // A failed stylesheet keeps its slot as an empty entry
    let bundled = bodies.iter().filter(|body| body.is_some()).count();
    let bodies: Vec<String> = bodies.into_iter().map(Option::unwrap_or_default).collect();
    debug!("styles"; "bundled {}", plural_count(bundled, "stylesheet"));
    Ok(bodies.join("\n"))
}

async fn process_style(ctx: &BuildContext, reference: String) -> Option<String> {
    let config = &ctx.config;

    let Some(mapped) = ctx.mapper().map(&reference) else {
        log!("warn"; "stylesheet {} is not under the source root, skipped", reference);
        return None;
    };

    let source = match tokio::fs::read_to_string(&mapped.origin).await {
        Ok(source) => source,
        Err(e) => {
            log!("error"; "cannot read stylesheet {}: {}", mapped.relative, e);
            return None;
        }
    };

    let source = if config.options.preprocess_resources {
        match preprocess(&source, config.preprocess_context()) {
            Ok(source) => source,
            Err(e) => {
                log!("error"; "{}: {}", mapped.relative, e);
                return None;
            }
        }
    } else {
        source
    };

    let css = rewrite_style_paths(&source, &config.vendor);

    if config.options.skip_resource_compression || is_minified(&mapped.origin) {
        return Some(css);
    }
    match minify_css(&css) {
        Some(min) => Some(min),
        None => {
            log!("error"; "cannot minify stylesheet {}", mapped.relative);
            None
        }
    }
}
