//! Development mirror with file watching.
//!
//! Serve copies `src/` into `www/` untouched, then keeps the copy in sync:
//!
//! ```text
//! notify → std mpsc → bridge thread → tokio mpsc → Debouncer → apply_change
//! ```
//!
//! The watcher starts before the initial mirror so no change made while
//! copying is lost. The serve marker exists for the whole session.

mod debouncer;


pub use debouncer::ChangeKind;

use std::path::{Component, Path};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::asset::{PathFilter, PathMapper, collect_all_files, copy_file, copy_resources, reset_dir};
use crate::config::BuildConfig;
use crate::core::{MarkerGuard, is_shutdown, setup_shutdown_handler};
use crate::logger::{status_error, status_success};
use crate::utils::plural_count;
use crate::{debug, log};

use debouncer::{Debouncer, POLL_MS};

/// An active serve session. Dropping it removes the marker.
#[derive(Debug)]
pub struct Session {
    pub mirrored: usize,
    _marker: MarkerGuard,
}

/// Wipe `www/`, mirror all of `src/` into it and write the serve marker.
///
/// A marker left behind by an earlier session does not block startup.
pub async fn start_session(config: &BuildConfig) -> Result<Session> {
    let paths = &config.paths;
    let marker = MarkerGuard::create(paths.marker.clone())?;

    reset_dir(&paths.www).await?;
    let mapper = PathMapper::new(&paths.src, &paths.www);
    let files = collect_all_files(&paths.src)
        .iter()
        .filter_map(|path| mapper.map_path(path))
        .collect();
    let mirrored = copy_resources(files, &PathFilter::All).await?;

    Ok(Session {
        mirrored,
        _marker: marker,
    })
}

/// Mirror the project and watch it until interrupted.
pub async fn serve_project(config: BuildConfig) -> Result<()> {
    let paths = &config.paths;
    let src = paths
        .src
        .canonicalize()
        .with_context(|| format!("source directory {} not found", paths.src.display()))?;

    // Watcher first: changes during the initial mirror are buffered
    let (_watcher, events) = start_watcher(&src)?;

    // Handler before the marker, so an interrupt while mirroring cleans up
    setup_shutdown_handler(paths.marker.clone())?;
    let session = start_session(&config).await?;
    log!(
        "serve";
        "mirrored {} into {}",
        plural_count(session.mirrored, "file"),
        paths.www.display()
    );
    log!("watch"; "watching {}", paths.src.display());

    let mirror = PathMapper::new(src, &paths.www);
    watch_loop(events, &mirror, Debouncer::new()).await;
    Ok(())
}

/// Start a recursive watch on `src`, bridged into a tokio channel.
fn start_watcher(src: &Path) -> Result<(RecommendedWatcher, mpsc::Receiver<notify::Event>)> {
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })
    .context("failed to create file watcher")?;
    watcher
        .watch(src, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", src.display()))?;

    let (async_tx, async_rx) = mpsc::channel::<notify::Event>(64);
    std::thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            match result {
                Ok(event) => {
                    if async_tx.blocking_send(event).is_err() {
                        break; // Receiver dropped
                    }
                }
                Err(e) => log!("watch"; "notify error: {}", e),
            }
        }
    });

    Ok((watcher, async_rx))
}

/// Feed events into the debouncer and mirror what stabilizes.
///
/// The tick is polled first so a steady event stream cannot hold back
/// changes that are already stable.
async fn watch_loop(
    mut events: mpsc::Receiver<notify::Event>,
    mirror: &PathMapper,
    mut debouncer: Debouncer,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(POLL_MS));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = ticker.tick() => {
                if is_shutdown() {
                    break;
                }
                for (path, kind) in debouncer.poll() {
                    apply_change(mirror, &path, kind).await;
                }
            }
            event = events.recv() => match event {
                Some(event) => debouncer.add_event(&event),
                None => break,
            },
        }
    }
}

/// Mirror one stabilized change, reporting the result on the status line.
async fn apply_change(mirror: &PathMapper, path: &Path, kind: ChangeKind) {
    let Some(mapped) = mirror.map_path(path) else {
        return;
    };
    if is_hidden(&mapped.relative) {
        return;
    }

    match mirror_change(&mapped.origin, &mapped.dest, kind).await {
        Ok(()) => status_success(&format!("{} {}", kind.label(), mapped.relative)),
        Err(e) => status_error(&format!("cannot mirror {}", mapped.relative), &format!("{e:#}")),
    }
}

/// Bring `dest` in line with `origin` after a change of `kind`.
pub async fn mirror_change(origin: &Path, dest: &Path, kind: ChangeKind) -> Result<()> {
    if kind == ChangeKind::Removed || !origin.exists() {
        return remove_mirrored(dest).await;
    }
    if origin.is_dir() {
        return tokio::fs::create_dir_all(dest)
            .await
            .with_context(|| format!("failed to create {}", dest.display()));
    }
    debug!("watch"; "copy {} -> {}", origin.display(), dest.display());
    copy_file(origin, dest).await
}

async fn remove_mirrored(dest: &Path) -> Result<()> {
    let result = if dest.is_dir() {
        tokio::fs::remove_dir_all(dest).await
    } else {
        tokio::fs::remove_file(dest).await
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", dest.display())),
    }
}

/// Dotfiles and anything inside a dot-directory are not mirrored.
fn is_hidden(relative: &str) -> bool {
    Path::new(relative).components().any(|c| {
        matches!(c, Component::Normal(part) if part.to_string_lossy().starts_with('.'))
    })
}
