//! Git utilities - type definitions and helper functions
//!
//! Provides common types, the error type, and the process runner used across git operations.

use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;

/// Git status entry (porcelain v1: X=index/staged, Y=worktree/unstaged)
#[derive(Debug, Clone, PartialEq)]
pub struct GitStatusEntry {
    pub path: String,
    /// Raw two-character XY code, e.g. `" M"`, `"A "`, `"??"`, `"UU"`
    pub code: String,
    pub orig_path: Option<String>,
}

impl GitStatusEntry {
    /// Index side has a change (X is neither space nor untracked/ignored)
    pub fn is_staged(&self) -> bool {
        if self.is_conflicted() {
            return false;
        }
        !matches!(self.index_code(), ' ' | '?' | '!')
    }

    /// Unmerged entry per `git status` docs: DD, AU, UD, UA, DU, AA, UU
    pub fn is_conflicted(&self) -> bool {
        matches!(
            self.code.as_str(),
            "DD" | "AU" | "UD" | "UA" | "DU" | "AA" | "UU"
        )
    }

    fn index_code(&self) -> char {
        self.code.chars().next().unwrap_or(' ')
    }
}

/// Working tree status, including upstream tracking info from the `##` header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GitStatusResult {
    /// None on detached HEAD
    pub branch: Option<String>,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    pub entries: Vec<GitStatusEntry>,
}

impl GitStatusResult {
    pub fn staged_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_staged()).count()
    }

    pub fn conflicted_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_conflicted()).count()
    }

    /// Changed paths in porcelain order
    pub fn changed_paths(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }
}

/// Git log entry (single commit)
#[derive(Debug, Clone, PartialEq)]
pub struct GitLogEntry {
    pub sha: String,     // full SHA
    pub message: String, // subject line
    pub author: String,
    pub date: String, // ISO 8601
}

impl GitLogEntry {
    pub fn short_sha(&self) -> &str {
        let end = self
            .sha
            .char_indices()
            .nth(SHORT_SHA_LEN)
            .map(|(i, _)| i)
            .unwrap_or(self.sha.len());
        &self.sha[..end]
    }
}

pub const SHORT_SHA_LEN: usize = 7;

/// Git branches result
#[derive(Debug, Clone, PartialEq)]
pub struct GitBranchesResult {
    pub current: String,
    /// Local branch names in the order git reports them
    pub branches: Vec<String>,
}

/// Error type for git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository")]
    NotAGitRepo,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    CommandFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 从 tokio JoinError 转换
impl From<tokio::task::JoinError> for GitError {
    fn from(e: tokio::task::JoinError) -> Self {
        GitError::Internal(format!("Task failed: {}", e))
    }
}

/// Build a git command rooted at `workspace_root`.
///
/// Terminal prompts are disabled so pull/push against a remote that wants
/// credentials fail instead of hanging the blocking pool.
pub fn git_command(workspace_root: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workspace_root)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_EDITOR", "true");
    cmd
}

/// Run git with `args` and return stdout on success.
///
/// A non-zero exit becomes `CommandFailed` carrying stderr (or stdout when
/// stderr is empty, which is where `git commit` reports "nothing to commit").
pub fn run_git(workspace_root: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = git_command(workspace_root).args(args).output()?;
    ok_stdout(output)
}

pub(crate) fn ok_stdout(output: Output) -> Result<String, GitError> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let msg = if !stderr.is_empty() {
        stderr
    } else if !stdout.is_empty() {
        stdout
    } else {
        "Unknown error".to_string()
    };
    Err(GitError::CommandFailed(msg))
}

/// Reject values that git would parse as an option
pub fn validate_ref(value: &str) -> Result<(), GitError> {
    if value.trim().is_empty() {
        return Err(GitError::InvalidArgument("empty reference".to_string()));
    }
    if value.starts_with('-') {
        return Err(GitError::InvalidArgument(format!(
            "'{}' looks like an option",
            value
        )));
    }
    Ok(())
}

/// Check if workspace is in a git repository and get repo root
pub fn get_git_repo_root(workspace_root: &Path) -> Option<String> {
    let output = git_command(workspace_root)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

/// Get the fetch URL of the `origin` remote
pub fn get_origin_url(workspace_root: &Path) -> Option<String> {
    let output = git_command(workspace_root)
        .args(["remote", "get-url", "origin"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }
    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        None
    } else {
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str) -> GitStatusEntry {
        GitStatusEntry {
            path: "a.rs".to_string(),
            code: code.to_string(),
            orig_path: None,
        }
    }

    #[test]
    fn test_staged_and_conflicted_flags() {
        assert!(entry("M ").is_staged());
        assert!(entry("MM").is_staged());
        assert!(entry("A ").is_staged());
        assert!(!entry(" M").is_staged());
        assert!(!entry("??").is_staged());

        assert!(entry("UU").is_conflicted());
        assert!(entry("AA").is_conflicted());
        assert!(!entry("UU").is_staged());
        assert!(!entry("M ").is_conflicted());
    }

    #[test]
    fn test_short_sha() {
        let e = GitLogEntry {
            sha: "0123456789abcdef".to_string(),
            message: String::new(),
            author: String::new(),
            date: String::new(),
        };
        assert_eq!(e.short_sha(), "0123456");

        let short = GitLogEntry {
            sha: "abc".to_string(),
            ..e
        };
        assert_eq!(short.short_sha(), "abc");
    }

    #[test]
    fn test_validate_ref() {
        assert!(validate_ref("main").is_ok());
        assert!(validate_ref("HEAD~1").is_ok());
        assert!(validate_ref("--force").is_err());
        assert!(validate_ref("  ").is_err());
    }
}
