//! Process state for serve mode.
//!
//! - `SHUTDOWN`: termination requested (SIGINT / SIGTERM)
//! - the serve marker file: exists while a serve session is running, so a
//!   build triggered in the meantime can skip the redundant full rebuild

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::{debug, log};

/// Shutdown has been requested (SIGINT or SIGTERM received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

// =============================================================================
// SHUTDOWN state
// =============================================================================

/// Install the SIGINT/SIGTERM handler. Call once, before the marker is written.
///
/// The handler removes the serve marker before the process exits.
pub fn setup_shutdown_handler(marker: PathBuf) -> Result<()> {
    ctrlc::set_handler(move || {
        on_termination(&SHUTDOWN, &marker);
        std::process::exit(0);
    })
    .map_err(|e| anyhow::anyhow!("failed to set termination handler: {}", e))
}

fn on_termination(flag: &AtomicBool, marker: &Path) {
    flag.store(true, Ordering::SeqCst);
    log!("serve"; "shutting down...");
    remove_marker(marker);
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

// =============================================================================
// Serve marker
// =============================================================================

/// Whether a serve session is recorded as active.
pub fn marker_present(marker: &Path) -> bool {
    marker.is_file()
}

/// Record an active serve session. Content is irrelevant.
pub fn write_marker(marker: &Path) -> Result<()> {
    if let Some(parent) = marker.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(marker, b"")
        .with_context(|| format!("failed to write serve marker {}", marker.display()))
}

/// Best-effort marker removal.
pub fn remove_marker(marker: &Path) {
    match fs::remove_file(marker) {
        Ok(()) => debug!("serve"; "removed {}", marker.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log!("warn"; "cannot remove {}: {}", marker.display(), e),
    }
}

/// Writes the marker on creation and removes it when dropped.
#[derive(Debug)]
pub struct MarkerGuard {
    path: PathBuf,
}

impl MarkerGuard {
    pub fn create(path: PathBuf) -> Result<Self> {
        write_marker(&path)?;
        Ok(Self { path })
    }
}

impl Drop for MarkerGuard {
    fn drop(&mut self) {
        remove_marker(&self.path);
    }
}

// =============================================================================
// Tests
// =============================================================================
