//! Final assembly: bundle bodies, entry rewrite and artifact writes.

use std::path::Path;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::{Captures, Regex};

use crate::asset::minify::minify_html;
use crate::config::{BuildOptions, ENTRY_FILE};
use crate::error::BuildError;
use crate::transform::wrap_scope;

/// Aggregated script file name.
pub const SCRIPT_BUNDLE: &str = "all.min.js";
/// Aggregated stylesheet file name.
pub const STYLE_BUNDLE: &str = "all.min.css";

static SCRIPT_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<!--\s*startsrc\s*-->).*?(<!--\s*endsrc\s*-->)").unwrap()
});
static STYLE_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<!--\s*startcss\s*-->).*?(<!--\s*endcss\s*-->)").unwrap()
});

/// The three files a build publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub markup: String,
    pub script: String,
    pub style: String,
}

impl Artifacts {
    /// Combine stage outputs into the publishable set.
    pub fn assemble(
        options: &BuildOptions,
        entry_markup: &str,
        scripts: String,
        registry: &str,
        style: String,
        version: u128,
    ) -> Result<Self, BuildError> {
        let markup = rewrite_entry(entry_markup, version)?;
        let markup = if options.skip_html_compression {
            markup
        } else {
            minify_html(&markup)
        };

        Ok(Self {
            markup,
            script: bundle_scripts(scripts, registry),
            style,
        })
    }

    /// Write all artifacts into `dir`.
    pub async fn write(&self, dir: &Path) -> Result<(), BuildError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| BuildError::Io(dir.to_path_buf(), e))?;

        for (name, content) in [
            (ENTRY_FILE, &self.markup),
            (SCRIPT_BUNDLE, &self.script),
            (STYLE_BUNDLE, &self.style),
        ] {
            let path = dir.join(name);
            tokio::fs::write(&path, content)
                .await
                .map_err(|e| BuildError::Io(path, e))?;
        }
        Ok(())
    }
}

/// Script bundle with the template registry appended in its own scope.
pub fn bundle_scripts(scripts: String, registry: &str) -> String {
    let registry = wrap_scope(registry);
    if scripts.is_empty() {
        registry
    } else {
        format!("{scripts}\n{registry}")
    }
}

/// Replace both marker regions with a single bundle tag each.
pub fn rewrite_entry(markup: &str, version: u128) -> Result<String, BuildError> {
    if !SCRIPT_REGION.is_match(markup) {
        return Err(BuildError::MissingMarker("startsrc/endsrc"));
    }
    if !STYLE_REGION.is_match(markup) {
        return Err(BuildError::MissingMarker("startcss/endcss"));
    }

    let markup = SCRIPT_REGION.replace(markup, |caps: &Captures| {
        format!(
            "{}<script src=\"{SCRIPT_BUNDLE}?v={version}\"></script>{}",
            &caps[1], &caps[2]
        )
    });
    let markup = STYLE_REGION.replace(&markup, |caps: &Captures| {
        format!(
            "{}<link rel=\"stylesheet\" href=\"{STYLE_BUNDLE}?v={version}\">{}",
            &caps[1], &caps[2]
        )
    });
    Ok(markup.into_owned())
}

/// Cache-busting value: milliseconds since the epoch.
pub fn cache_buster() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
