//! Repository root resolution
//!
//! A repository root is the nearest ancestor containing `.git` (a directory for
//! ordinary clones, a file for linked worktrees and submodules).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Repository metadata entry marking the boundary of a work tree
pub const REPO_MARKER: &str = ".git";

/// Absolute path of a resolved repository root
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryRoot(PathBuf);

impl RepositoryRoot {
    /// Wrap a path without checking for `.git`
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }

    /// Last path component, used as the display name of the repository
    pub fn name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.0.display().to_string())
    }
}

impl AsRef<Path> for RepositoryRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for RepositoryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Walk from `start` toward the filesystem root and return the first directory containing `.git`.
///
/// `start` may be a file or a directory, existing or not (a deleted file still
/// resolves through its parents). Returns `None` when no ancestor qualifies or
/// when a relative `start` cannot be made absolute.
pub fn resolve_repository_root(start: &Path) -> Option<RepositoryRoot> {
    let start = normalize(start)?;

    start
        .ancestors()
        .find(|dir| dir.join(REPO_MARKER).exists())
        .map(RepositoryRoot::new)
}

/// Canonicalize when the path exists so every descendant resolves to the same root;
/// otherwise canonicalize the closest existing ancestor and re-append the rest.
fn normalize(path: &Path) -> Option<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    if let Ok(canonical) = fs::canonicalize(&absolute) {
        return Some(canonical);
    }

    let mut missing = Vec::new();
    let mut cursor = absolute.as_path();
    while let Some(parent) = cursor.parent() {
        if let Some(name) = cursor.file_name() {
            missing.push(name.to_os_string());
        }
        if let Ok(mut canonical) = fs::canonicalize(parent) {
            for name in missing.iter().rev() {
                canonical.push(name);
            }
            return Some(canonical);
        }
        cursor = parent;
    }

    Some(absolute)
}
