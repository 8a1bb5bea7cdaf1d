//! Production build orchestration.
//!
//! Build phases:
//! - **Clean** - wipe `tmp/`, recreate the staging directory
//! - **Templates** - template registry script (fatal on failure)
//! - **Extract** - preprocess the entry document, collect its references
//! - **Bundle** - scripts, styles and static resources, concurrently
//! - **Assemble** - entry rewrite, artifacts written to staging
//! - **Publish** - wipe `www/`, move staging into it, remove `tmp/`
//!
//! Nothing reaches `www/` unless every phase before publish succeeded.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::asset::{PathFilter, collect_all_files, copy_file, copy_resources, reset_dir};
use crate::config::{BuildConfig, ENTRY_FILE};
use crate::core::marker_present;
use crate::error::{BuildError, StageFailure};
use crate::pipeline::assemble::{Artifacts, cache_buster};
use crate::pipeline::{
    BuildContext, build_template_registry, extract_resources, process_scripts, process_styles,
};
use crate::transform::preprocess;
use crate::utils::plural_count;
use crate::{debug, log};

/// Files the static copy leaves to the bundling stages.
const BUNDLED_EXTENSIONS: &str = r"(?i)\.(js|css|html)$";

/// Counts reported once a build is published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub scripts: usize,
    pub stylesheets: usize,
    pub templates: usize,
    pub resources: usize,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {} copied",
            plural_count(self.scripts, "script"),
            plural_count(self.stylesheets, "stylesheet"),
            plural_count(self.templates, "template"),
            plural_count(self.resources, "resource"),
        )
    }
}

/// Build the project unless a serve session is active.
///
/// Returns `None` when the build was skipped.
pub async fn build_project(config: BuildConfig) -> Result<Option<BuildSummary>> {
    if marker_present(&config.paths.marker) {
        log!("build"; "serve session active, skipping build");
        return Ok(None);
    }

    debug!("build"; "{} build of {}", config.options.environment.as_str(), config.paths.root.display());
    let ctx = BuildContext::new(config);
    let summary = run_build(&ctx).await?;
    log!("build"; "published {}", summary);
    Ok(Some(summary))
}

/// Run every build phase and publish the result.
pub async fn run_build(ctx: &BuildContext) -> Result<BuildSummary> {
    let config = &ctx.config;
    let paths = &config.paths;

    // Clean
    reset_dir(&paths.tmp).await?;
    tokio::fs::create_dir_all(&paths.staging)
        .await
        .with_context(|| format!("failed to create {}", paths.staging.display()))?;

    // Templates
    let registry = build_template_registry(ctx).await?;
    if !registry.clean {
        log!("warn"; "templates have lint findings");
    }

    // Extract
    let entry = tokio::fs::read_to_string(&paths.entry)
        .await
        .map_err(|e| BuildError::Io(paths.entry.clone(), e))?;
    let entry = preprocess(&entry, config.preprocess_context())
        .map_err(|e| BuildError::Preprocess(ENTRY_FILE.to_string(), e))?;
    let extracted = extract_resources(&entry).map_err(BuildError::from)?;
    let resources = &extracted.resources;
    debug!(
        "build";
        "entry references {} and {}",
        plural_count(resources.scripts.len(), "script"),
        plural_count(resources.links.len(), "stylesheet")
    );

    // Bundle
    let (scripts, styles, copied) = tokio::join!(
        process_scripts(ctx, &resources.scripts),
        process_styles(ctx, &resources.links),
        copy_static_resources(ctx),
    );
    let (script, style) = StageFailure::combine(scripts, styles).map_err(BuildError::from)?;
    let copied = copied.map_err(BuildError::Other)?;

    // Assemble
    let artifacts = Artifacts::assemble(
        &config.options,
        &extracted.markup,
        script,
        &registry.body,
        style,
        cache_buster(),
    )?;
    artifacts.write(&paths.staging).await?;

    // Publish
    publish(&paths.staging, &paths.www).await?;
    if let Err(e) = tokio::fs::remove_dir_all(&paths.tmp).await {
        debug!("build"; "cannot remove {}: {}", paths.tmp.display(), e);
    }

    Ok(BuildSummary {
        scripts: resources.scripts.len(),
        stylesheets: resources.links.len(),
        templates: registry.count,
        resources: copied + registry.copied,
    })
}

/// Copy every non-bundled source file into staging.
async fn copy_static_resources(ctx: &BuildContext) -> Result<usize> {
    let mapper = ctx.mapper();
    let files = collect_all_files(mapper.src_root())
        .iter()
        .filter_map(|path| mapper.map_path(path))
        .collect();
    let filter = PathFilter::exclude(&[BUNDLED_EXTENSIONS])?;
    copy_resources(files, &filter).await
}

/// Replace `www` with the contents of `staging`.
async fn publish(staging: &Path, www: &Path) -> Result<()> {
    reset_dir(www).await?;

    let mut entries = tokio::fs::read_dir(staging)
        .await
        .with_context(|| format!("failed to read {}", staging.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let from = entry.path();
        let to = www.join(entry.file_name());
        if tokio::fs::rename(&from, &to).await.is_err() {
            // Rename fails across filesystems
            copy_tree(&from, &to).await?;
        }
    }
    Ok(())
}

async fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return copy_file(from, to).await;
    }
    for file in collect_all_files(from) {
        if let Ok(relative) = file.strip_prefix(from) {
            copy_file(&file, &to.join(relative)).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
