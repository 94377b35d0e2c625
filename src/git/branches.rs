//! Git branch management
//!
//! Provides functions for listing, switching, and creating branches.

use std::path::Path;

use super::utils::*;

/// List local branches and get current branch
///
/// Uses:
/// - `git rev-parse --abbrev-ref HEAD` for current branch
/// - `git for-each-ref refs/heads --format="%(refname:short)"` for branch list
pub fn git_branches(workspace_root: &Path) -> Result<GitBranchesResult, GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }

    let current_output = git_command(workspace_root)
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()?;

    let current = if current_output.status.success() {
        String::from_utf8_lossy(&current_output.stdout)
            .trim()
            .to_string()
    } else {
        "HEAD".to_string() // Unborn branch or detached HEAD
    };

    let stdout = run_git(
        workspace_root,
        &["for-each-ref", "refs/heads", "--format=%(refname:short)"],
    )?;
    let branches = stdout
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    Ok(GitBranchesResult { current, branches })
}

/// Switch to a different branch
///
/// Uses `git switch <branch>` (Git 2.23+), falls back to `git checkout <branch>`
pub fn git_switch_branch(workspace_root: &Path, branch: &str) -> Result<(), GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }
    validate_ref(branch)?;

    switch_with_fallback(workspace_root, &["switch", branch], &["checkout", branch])
}

/// Create and switch to a new branch
///
/// Uses `git switch -c <branch>` (Git 2.23+), falls back to `git checkout -b <branch>`
pub fn git_create_branch(workspace_root: &Path, branch: &str) -> Result<(), GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }
    validate_ref(branch)?;

    switch_with_fallback(
        workspace_root,
        &["switch", "-c", branch],
        &["checkout", "-b", branch],
    )
}

fn switch_with_fallback(
    workspace_root: &Path,
    switch_args: &[&str],
    checkout_args: &[&str],
) -> Result<(), GitError> {
    match git_command(workspace_root).args(switch_args).output() {
        Ok(output) if output.status.success() => return Ok(()),
        Ok(output) => {
            // Old git without `switch` reports "is not a git command"; anything else is a real error
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.contains("is not a git command") {
                return ok_stdout(output).map(|_| ());
            }
        }
        Err(_) => {
            // Fall through to checkout
        }
    }

    run_git(workspace_root, checkout_args).map(|_| ())
}
