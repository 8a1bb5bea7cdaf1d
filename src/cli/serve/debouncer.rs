use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use rustc_hash::FxHashMap;

/// A change is applied once the file has been still for this long.
pub(super) const QUIESCENCE_MS: u64 = 2000;
/// How often pending changes are checked for stability.
pub(super) const POLL_MS: u64 = 100;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Size and mtime, compared between polls to detect ongoing writes.
type Fingerprint = Option<(u64, SystemTime)>;

#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: ChangeKind,
    last_change: Instant,
    fingerprint: Fingerprint,
}

/// Holds changes back until the file stops changing.
pub(super) struct Debouncer {
    changes: FxHashMap<PathBuf, Pending>,
    quiescence: Duration,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self::with_quiescence(Duration::from_millis(QUIESCENCE_MS))
    }

    pub(super) fn with_quiescence(quiescence: Duration) -> Self {
        Self {
            changes: FxHashMap::default(),
            quiescence,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → dropped (appeared then vanished)
    /// - otherwise the first kind wins and the quiet period restarts
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // mtime/chmod noise
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.record(path.clone(), kind);
        }
    }

    fn record(&mut self, path: PathBuf, kind: ChangeKind) {
        let now = Instant::now();
        let fingerprint = fingerprint(&path);

        let Some(existing) = self.changes.get_mut(&path) else {
            crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
            self.changes.insert(
                path,
                Pending {
                    kind,
                    last_change: now,
                    fingerprint,
                },
            );
            return;
        };

        match (existing.kind, kind) {
            (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                existing.kind = kind;
            }
            (ChangeKind::Modified, ChangeKind::Removed) => {
                existing.kind = ChangeKind::Removed;
            }
            (ChangeKind::Created, ChangeKind::Removed) => {
                crate::debug!("watch"; "discard created+removed: {}", path.display());
                self.changes.remove(&path);
                return;
            }
            _ => {}
        }
        existing.last_change = now;
        existing.fingerprint = fingerprint;
    }

    /// Take every change that has been quiet for the whole window.
    ///
    /// A file whose size or mtime moved since the last look restarts its
    /// window instead. Results are sorted by path.
    pub(super) fn poll(&mut self) -> Vec<(PathBuf, ChangeKind)> {
        let now = Instant::now();
        let mut ready = Vec::new();

        for (path, pending) in &mut self.changes {
            if now.duration_since(pending.last_change) < self.quiescence {
                continue;
            }
            if pending.kind != ChangeKind::Removed {
                let current = fingerprint(path);
                if current != pending.fingerprint {
                    pending.fingerprint = current;
                    pending.last_change = now;
                    continue;
                }
            }
            ready.push((path.clone(), pending.kind));
        }

        for (path, _) in &ready {
            self.changes.remove(path);
        }
        ready.sort_by(|a, b| a.0.cmp(&b.0));
        ready
    }

    /// Kind of the change waiting on `path`, if any.
    #[cfg(test)]
    pub(super) fn pending(&self, path: &Path) -> Option<ChangeKind> {
        self.changes.get(path).map(|p| p.kind)
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.changes.len()
    }
}

fn fingerprint(path: &Path) -> Fingerprint {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.len(), meta.modified().ok()?))
}

/// Check if path is a temp/backup file (editor artifacts).
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
