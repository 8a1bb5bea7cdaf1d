//! Reference-to-path mapping and concurrent resource copies.
//!
//! A [`PathMapper`] turns a reference found in markup (`js/app.js?v=2`,
//! `/img/logo.png`, an absolute path under the source root) into an
//! origin/destination pair. [`copy_resources`] copies a batch of pairs
//! concurrently and fails on the first error.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tokio::task::JoinSet;

use crate::debug;

/// Which mapped files a copy includes.
#[derive(Debug, Clone, Default)]
pub enum PathFilter {
    /// Copy everything.
    #[default]
    All,
    /// Copy only files matching one of the patterns.
    Include(Vec<Regex>),
    /// Copy everything except files matching one of the patterns.
    Exclude(Vec<Regex>),
}

impl PathFilter {
    pub fn include(patterns: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self::Include(compile(patterns)?))
    }

    pub fn exclude(patterns: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self::Exclude(compile(patterns)?))
    }

    /// Whether a source-relative path passes the filter.
    pub fn allows(&self, relative: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(patterns) => patterns.iter().any(|p| p.is_match(relative)),
            Self::Exclude(patterns) => !patterns.iter().any(|p| p.is_match(relative)),
        }
    }
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

/// A resolved reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPath {
    /// Slash-separated path relative to both roots.
    pub relative: String,
    pub origin: PathBuf,
    pub dest: PathBuf,
}

/// Maps references between a source root and a destination root.
#[derive(Debug, Clone)]
pub struct PathMapper {
    src_root: PathBuf,
    dest_root: PathBuf,
}

impl PathMapper {
    pub fn new(src_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            src_root: src_root.into(),
            dest_root: dest_root.into(),
        }
    }

    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    /// Resolve a markup reference.
    ///
    /// Query strings and fragments are dropped. Remote references and paths
    /// that climb out of the source root resolve to `None`.
    pub fn map(&self, reference: &str) -> Option<MappedPath> {
        let reference = strip_query(reference.trim());
        if reference.is_empty() || is_remote(reference) {
            return None;
        }

        let path = Path::new(reference);
        if path.is_absolute()
            && let Ok(rel) = path.strip_prefix(&self.src_root)
        {
            return self.map_relative(rel);
        }
        self.map_relative(Path::new(reference.trim_start_matches('/')))
    }

    /// Resolve an absolute file path under the source root.
    pub fn map_path(&self, path: &Path) -> Option<MappedPath> {
        self.map_relative(path.strip_prefix(&self.src_root).ok()?)
    }

    fn map_relative(&self, rel: &Path) -> Option<MappedPath> {
        let parts = normalize(rel)?;
        if parts.is_empty() {
            return None;
        }
        let relative = parts.join("/");
        let origin = parts.iter().fold(self.src_root.clone(), |p, c| p.join(c));
        let dest = parts.iter().fold(self.dest_root.clone(), |p, c| p.join(c));
        Some(MappedPath {
            relative,
            origin,
            dest,
        })
    }
}

/// Drop `?query` and `#fragment`.
pub fn strip_query(reference: &str) -> &str {
    reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference)
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("//") || reference.contains("://") || reference.starts_with("data:")
}

/// Lexically resolve `.` and `..`. `None` if the path escapes its root.
fn normalize(path: &Path) -> Option<Vec<String>> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                parts.pop()?;
            }
        }
    }
    Some(parts)
}

/// Copy every mapped file that exists and passes `filter`.
///
/// Copies run concurrently; the first failure aborts the rest. Returns the
/// number of files copied.
pub async fn copy_resources(files: Vec<MappedPath>, filter: &PathFilter) -> Result<usize> {
    let mut set = JoinSet::new();

    for file in files {
        if !filter.allows(&file.relative) {
            continue;
        }
        if !tokio::fs::try_exists(&file.origin).await.unwrap_or(false) {
            debug!("copy"; "skipping missing {}", file.relative);
            continue;
        }
        set.spawn(async move { copy_file(&file.origin, &file.dest).await });
    }

    let mut copied = 0;
    while let Some(joined) = set.join_next().await {
        joined.context("copy task panicked")??;
        copied += 1;
    }
    Ok(copied)
}

/// Copy one file, creating parent directories as needed.
pub async fn copy_file(origin: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        // Concurrent copies may race to create the same directory
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::copy(origin, dest)
        .await
        .with_context(|| format!("failed to copy {} to {}", origin.display(), dest.display()))?;
    Ok(())
}

/// Remove `dir` with its contents, then recreate it empty.
pub async fn reset_dir(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("failed to clear {}", dir.display())),
    }
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_map_relative_reference() {
        let mapper = PathMapper::new("/app/src", "/app/tmp/build");
        let mapped = mapper.map("js/app.js?v=3#top").unwrap();
        assert_eq!(mapped.relative, "js/app.js");
        assert_eq!(mapped.origin, PathBuf::from("/app/src/js/app.js"));
        assert_eq!(mapped.dest, PathBuf::from("/app/tmp/build/js/app.js"));
    }

    #[test]
    fn test_map_root_relative_and_absolute() {
        let mapper = PathMapper::new("/app/src", "/out");
        assert_eq!(mapper.map("/img/logo.png").unwrap().relative, "img/logo.png");
        assert_eq!(
            mapper.map("/app/src/css/style.css").unwrap().dest,
            PathBuf::from("/out/css/style.css")
        );
        assert_eq!(mapper.map("./js/../js/a.js").unwrap().relative, "js/a.js");
    }

    #[test]
    fn test_map_rejects_remote_and_escaping() {
        let mapper = PathMapper::new("/app/src", "/out");
        assert!(mapper.map("https://cdn.example.com/x.js").is_none());
        assert!(mapper.map("//cdn.example.com/x.js").is_none());
        assert!(mapper.map("../secret.js").is_none());
        assert!(mapper.map("").is_none());
    }

    #[test]
    fn test_filter() {
        let exclude = PathFilter::exclude(&[r"\.js$", r"\.css$"]).unwrap();
        assert!(exclude.allows("img/a.png"));
        assert!(!exclude.allows("js/a.js"));

        let include = PathFilter::include(&[r"^fonts/"]).unwrap();
        assert!(include.allows("fonts/a.woff"));
        assert!(!include.allows("img/a.png"));

        assert!(PathFilter::All.allows("anything"));
    }

    #[tokio::test]
    async fn test_copy_resources() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::create_dir_all(src.join("img/icons")).unwrap();
        fs::write(src.join("img/icons/a.png"), b"png").unwrap();
        fs::write(src.join("img/b.png"), b"png2").unwrap();
        fs::write(src.join("app.js"), b"js").unwrap();

        let mapper = PathMapper::new(&src, &dest);
        let files = ["img/icons/a.png", "img/b.png", "app.js", "missing.png"]
            .iter()
            .filter_map(|r| mapper.map(r))
            .collect();
        let filter = PathFilter::exclude(&[r"\.js$"]).unwrap();

        let copied = copy_resources(files, &filter).await.unwrap();
        assert_eq!(copied, 2);
        assert_eq!(fs::read(dest.join("img/icons/a.png")).unwrap(), b"png");
        assert!(dest.join("img/b.png").exists());
        assert!(!dest.join("app.js").exists());
    }

    #[tokio::test]
    async fn test_copy_failure_rejects() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        // destination parent is a regular file, so directory creation fails
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let mapper = PathMapper::new(&src, blocker.join("out"));
        let files = vec![mapper.map("a.txt").unwrap()];
        assert!(copy_resources(files, &PathFilter::All).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_dir() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("www");
        fs::create_dir_all(target.join("stale")).unwrap();
        fs::write(target.join("stale/old.js"), "old").unwrap();

        reset_dir(&target).await.unwrap();
        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);

        // missing directory is created
        let fresh = dir.path().join("fresh");
        reset_dir(&fresh).await.unwrap();
        assert!(fresh.is_dir());
    }
}
