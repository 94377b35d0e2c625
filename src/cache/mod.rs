//! 仓库状态缓存
//!
//! Holds the last known ahead/behind counts and changed-file list per
//! repository root. Entries are written only by `refresh`; a failed status read
//! degrades the entry to `Unknown` instead of surfacing an error, and callers
//! hide the status line for anything that is not `Known`.

mod summary;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::git::{self, GitError};
use crate::repo::RepositoryRoot;

pub use summary::StatusSummary;

/// Upstream divergence plus locally changed paths for one root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub ahead: u32,
    pub behind: u32,
    pub changed_files: Vec<String>,
}

/// Outcome of a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSnapshot {
    Known(RepositoryStatus),
    /// Reading status failed (corrupt metadata, permission denied, git missing)
    Unknown,
}

impl StatusSnapshot {
    pub fn status(&self) -> Option<&RepositoryStatus> {
        match self {
            StatusSnapshot::Known(status) => Some(status),
            StatusSnapshot::Unknown => None,
        }
    }
}

/// Where the cache gets fresh status from
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn read_status(&self, root: &RepositoryRoot) -> Result<RepositoryStatus, GitError>;
}

/// Reads via `git status --porcelain=v1 -b` on the blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct GitStatusSource;

#[async_trait]
impl StatusSource for GitStatusSource {
    async fn read_status(&self, root: &RepositoryRoot) -> Result<RepositoryStatus, GitError> {
        let path = root.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || git::git_status(&path)).await??;
        Ok(RepositoryStatus {
            ahead: result.ahead,
            behind: result.behind,
            changed_files: result.changed_paths(),
        })
    }
}

/// Per-root slot. `epoch` advances on every invalidation so a refresh that
/// started before the invalidation cannot write its (already stale) result.
#[derive(Default)]
struct Slot {
    snapshot: Option<StatusSnapshot>,
    epoch: u64,
}

struct CacheInner {
    source: Arc<dyn StatusSource>,
    slots: Mutex<HashMap<RepositoryRoot, Slot>>,
}

/// Shared handle; clones refer to the same cache
#[derive(Clone)]
pub struct StatusCache {
    inner: Arc<CacheInner>,
}

impl StatusCache {
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                source,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Cache backed by the system git binary
    pub fn with_git() -> Self {
        Self::new(Arc::new(GitStatusSource))
    }

    /// Read `root` and store the result. Never fails: errors become `Unknown`.
    ///
    /// Overlapping refreshes for the same root are allowed; the one that
    /// completes last wins.
    pub async fn refresh(&self, root: &RepositoryRoot) -> StatusSnapshot {
        let started_epoch = self.epoch(root);

        let snapshot = match self.inner.source.read_status(root).await {
            Ok(status) => StatusSnapshot::Known(status),
            Err(e) => {
                warn!("Status refresh failed for {}: {}", root, e);
                StatusSnapshot::Unknown
            }
        };

        if let Ok(mut slots) = self.inner.slots.lock() {
            let slot = slots.entry(root.clone()).or_default();
            if slot.epoch == started_epoch {
                slot.snapshot = Some(snapshot.clone());
            } else {
                debug!("Discarding refresh for {} started before invalidation", root);
            }
        }

        snapshot
    }

    /// Run `refresh` in the background
    pub fn spawn_refresh(&self, root: RepositoryRoot) -> JoinHandle<StatusSnapshot> {
        let cache = self.clone();
        tokio::spawn(async move { cache.refresh(&root).await })
    }

    /// Drop the entry for `root`; it stays hidden until the next refresh completes
    pub fn invalidate(&self, root: &RepositoryRoot) {
        if let Ok(mut slots) = self.inner.slots.lock() {
            let slot = slots.entry(root.clone()).or_default();
            slot.snapshot = None;
            slot.epoch += 1;
        }
    }

    pub fn get(&self, root: &RepositoryRoot) -> Option<StatusSnapshot> {
        let slots = self.inner.slots.lock().ok()?;
        slots.get(root).and_then(|slot| slot.snapshot.clone())
    }

    /// Display text for `root`, or `None` when the status should be hidden
    pub fn summary(&self, root: &RepositoryRoot) -> Option<StatusSummary> {
        match self.get(root)? {
            StatusSnapshot::Known(status) => Some(StatusSummary::from_status(&status)),
            StatusSnapshot::Unknown => None,
        }
    }

    fn epoch(&self, root: &RepositoryRoot) -> u64 {
        self.inner
            .slots
            .lock()
            .ok()
            .and_then(|slots| slots.get(root).map(|slot| slot.epoch))
            .unwrap_or(0)
    }
}
