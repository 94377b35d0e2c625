//! Asynchronous repository handle
//!
//! `Repository` is the capability seam the interpreter and session depend on;
//! `GitRepository` implements it on top of the synchronous `git` module by
//! running every call on tokio's blocking pool.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::git::{self, GitBranchesResult, GitError, GitLogEntry, GitStatusResult};

use super::context::RepositoryContext;
use super::root::{resolve_repository_root, RepositoryRoot};

/// Repository operations bound to one root. Every operation may fail.
#[async_trait]
pub trait Repository: Send + Sync {
    fn root(&self) -> &RepositoryRoot;

    async fn status(&self) -> Result<GitStatusResult, GitError>;
    async fn log(&self, limit: usize) -> Result<Vec<GitLogEntry>, GitError>;
    async fn diff(&self) -> Result<String, GitError>;
    async fn pull(&self) -> Result<(), GitError>;
    async fn push(&self) -> Result<(), GitError>;
    async fn commit(&self, message: &str) -> Result<(), GitError>;
    async fn branches(&self) -> Result<GitBranchesResult, GitError>;
    async fn checkout(&self, name: &str) -> Result<(), GitError>;
    async fn create_branch(&self, name: &str) -> Result<(), GitError>;
    async fn stash(&self) -> Result<(), GitError>;
    async fn stash_pop(&self) -> Result<(), GitError>;
    /// Stash, pull, pop. `Ok(true)` when local changes were stashed and restored.
    async fn stash_merge(&self) -> Result<bool, GitError>;
    async fn reset(&self) -> Result<(), GitError>;
    async fn revert(&self, reference: &str) -> Result<(), GitError>;
    async fn show(&self, reference: &str) -> Result<String, GitError>;
    /// `file` is absolute or relative to `root()`; `line` is 1-based
    async fn blame(&self, file: &str, line: u32) -> Result<String, GitError>;
    async fn raw(&self, args: Vec<String>) -> Result<String, GitError>;
    async fn context(&self) -> Result<RepositoryContext, GitError>;
}

/// Repository handle backed by the system git binary
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: RepositoryRoot,
}

impl GitRepository {
    pub fn new(root: RepositoryRoot) -> Self {
        Self { root }
    }

    /// Resolve the repository containing `path` and bind a handle to it
    pub fn discover(path: &Path) -> Option<Self> {
        resolve_repository_root(path).map(Self::new)
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, GitError>
    where
        T: Send + 'static,
        F: FnOnce(PathBuf) -> Result<T, GitError> + Send + 'static,
    {
        let root = self.root.path().to_path_buf();
        debug!("git {} in {}", op, root.display());
        tokio::task::spawn_blocking(move || f(root)).await?
    }
}

#[async_trait]
impl Repository for GitRepository {
    fn root(&self) -> &RepositoryRoot {
        &self.root
    }

    async fn status(&self) -> Result<GitStatusResult, GitError> {
        self.run("status", |root| git::git_status(&root)).await
    }

    async fn log(&self, limit: usize) -> Result<Vec<GitLogEntry>, GitError> {
        self.run("log", move |root| git::git_log(&root, limit)).await
    }

    async fn diff(&self) -> Result<String, GitError> {
        self.run("diff", |root| git::git_diff(&root)).await
    }

    async fn pull(&self) -> Result<(), GitError> {
        self.run("pull", |root| git::git_pull(&root)).await
    }

    async fn push(&self) -> Result<(), GitError> {
        self.run("push", |root| git::git_push(&root)).await
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        let message = message.to_string();
        self.run("commit", move |root| git::git_commit(&root, &message).map(|_| ()))
            .await
    }

    async fn branches(&self) -> Result<GitBranchesResult, GitError> {
        self.run("branch", |root| git::git_branches(&root)).await
    }

    async fn checkout(&self, name: &str) -> Result<(), GitError> {
        let name = name.to_string();
        self.run("checkout", move |root| git::git_switch_branch(&root, &name))
            .await
    }

    async fn create_branch(&self, name: &str) -> Result<(), GitError> {
        let name = name.to_string();
        self.run("create-branch", move |root| git::git_create_branch(&root, &name))
            .await
    }

    async fn stash(&self) -> Result<(), GitError> {
        self.run("stash", |root| git::git_stash(&root)).await
    }

    async fn stash_pop(&self) -> Result<(), GitError> {
        self.run("stash pop", |root| git::git_stash_pop(&root)).await
    }

    async fn stash_merge(&self) -> Result<bool, GitError> {
        self.run("stash-merge", |root| git::git_stash_merge(&root)).await
    }

    async fn reset(&self) -> Result<(), GitError> {
        self.run("reset", |root| git::git_reset(&root)).await
    }

    async fn revert(&self, reference: &str) -> Result<(), GitError> {
        let reference = reference.to_string();
        self.run("revert", move |root| git::git_revert(&root, &reference))
            .await
    }

    async fn show(&self, reference: &str) -> Result<String, GitError> {
        let reference = reference.to_string();
        self.run("show", move |root| git::git_show(&root, &reference))
            .await
    }

    async fn blame(&self, file: &str, line: u32) -> Result<String, GitError> {
        let file = file.to_string();
        self.run("blame", move |root| {
            let (repo, relative) = locate_for_blame(&root, &file);
            git::git_blame_line(&repo, &relative, line)
        })
        .await
    }

    async fn raw(&self, args: Vec<String>) -> Result<String, GitError> {
        self.run("raw", move |root| git::git_raw(&root, &args)).await
    }

    async fn context(&self) -> Result<RepositoryContext, GitError> {
        let name = self.root.name();
        self.run("context", move |root| {
            let status = git::git_status(&root)?;
            let last = git::git_log(&root, 1)?.into_iter().next();
            let remote = git::get_origin_url(&root);
            Ok(RepositoryContext::from_parts(name, &status, last, remote))
        })
        .await
    }
}

/// Find the repository that actually contains `file` and the path relative to it.
///
/// Relative paths are taken against the bound root; the containing repository may be
/// a nested one (submodule, vendored checkout) rather than the bound root itself.
fn locate_for_blame(bound_root: &Path, file: &str) -> (PathBuf, String) {
    let candidate = if Path::new(file).is_absolute() {
        PathBuf::from(file)
    } else {
        bound_root.join(file)
    };
    let candidate = fs::canonicalize(&candidate).unwrap_or(candidate);

    let repo = candidate
        .parent()
        .and_then(resolve_repository_root)
        .map(RepositoryRoot::into_path)
        .unwrap_or_else(|| bound_root.to_path_buf());

    let relative = candidate
        .strip_prefix(&repo)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| file.to_string());

    (repo, relative)
}
