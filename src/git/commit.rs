//! Git commit and other mutating operations
//!
//! Provides commit, pull, push, stash, stash pop, stash-and-merge, reset and revert.

use std::path::Path;

use super::utils::*;

/// Commit staged changes
///
/// Uses `git commit --cleanup=verbatim -m <message>` so the message is stored exactly as given.
/// Returns the short SHA of the new commit on success.
pub fn git_commit(workspace_root: &Path, message: &str) -> Result<String, GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }

    if message.trim().is_empty() {
        return Err(GitError::InvalidArgument(
            "Commit message cannot be empty".to_string(),
        ));
    }

    if check_staged_changes(workspace_root) == 0 {
        return Err(GitError::CommandFailed(
            "No staged changes to commit".to_string(),
        ));
    }

    let output = git_command(workspace_root)
        .args(["commit", "--cleanup=verbatim", "-m", message])
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        // Check for common errors and provide helpful messages
        let error_msg = if stderr.contains("user.name") || stderr.contains("user.email") {
            "Git identity not configured. Run: git config user.name \"Your Name\" && git config user.email \"you@example.com\"".to_string()
        } else if stderr.contains("pre-commit") || stderr.contains("hook") {
            format!("Pre-commit hook failed: {}", stderr)
        } else if stderr.is_empty() {
            "Commit failed".to_string()
        } else {
            stderr
        };
        return Err(GitError::CommandFailed(error_msg));
    }

    let sha = run_git(workspace_root, &["rev-parse", "--short", "HEAD"])?;
    Ok(sha.trim().to_string())
}

/// Count staged files via `git diff --cached --name-only`
fn check_staged_changes(workspace_root: &Path) -> usize {
    match run_git(workspace_root, &["diff", "--cached", "--name-only"]) {
        Ok(stdout) => stdout.lines().filter(|l| !l.is_empty()).count(),
        Err(_) => 0,
    }
}

/// `git pull` for the current branch's upstream
pub fn git_pull(workspace_root: &Path) -> Result<(), GitError> {
    simple_op(workspace_root, &["pull"])
}

/// `git push` to the current branch's upstream
pub fn git_push(workspace_root: &Path) -> Result<(), GitError> {
    simple_op(workspace_root, &["push"])
}

pub fn git_stash(workspace_root: &Path) -> Result<(), GitError> {
    simple_op(workspace_root, &["stash"])
}

pub fn git_stash_pop(workspace_root: &Path) -> Result<(), GitError> {
    simple_op(workspace_root, &["stash", "pop"])
}

/// `git reset` (mixed, unstages everything; the working tree is untouched)
pub fn git_reset(workspace_root: &Path) -> Result<(), GitError> {
    simple_op(workspace_root, &["reset"])
}

/// Revert a commit without opening an editor
pub fn git_revert(workspace_root: &Path, reference: &str) -> Result<(), GitError> {
    validate_ref(reference)?;
    simple_op(workspace_root, &["revert", "--no-edit", reference])
}

/// Stash local changes, pull, then restore them
///
/// Returns whether anything was stashed. `git stash` exits 0 with nothing to
/// save, so the stash ref is compared before and after to avoid popping an
/// older, unrelated entry. A failed pull still restores the stash.
pub fn git_stash_merge(workspace_root: &Path) -> Result<bool, GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }

    let before = stash_top(workspace_root);
    simple_op(workspace_root, &["stash"])?;
    let stashed = stash_top(workspace_root) != before;

    if let Err(pull_err) = simple_op(workspace_root, &["pull"]) {
        if stashed {
            if let Err(pop_err) = simple_op(workspace_root, &["stash", "pop"]) {
                return Err(GitError::CommandFailed(format!(
                    "{}; restoring stashed changes also failed: {}",
                    pull_err, pop_err
                )));
            }
        }
        return Err(pull_err);
    }

    if stashed {
        simple_op(workspace_root, &["stash", "pop"])?;
    }
    Ok(stashed)
}

/// Object id of the newest stash entry, if any
fn stash_top(workspace_root: &Path) -> Option<String> {
    run_git(workspace_root, &["rev-parse", "-q", "--verify", "refs/stash"])
        .ok()
        .map(|sha| sha.trim().to_string())
        .filter(|sha| !sha.is_empty())
}

fn simple_op(workspace_root: &Path, args: &[&str]) -> Result<(), GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }
    run_git(workspace_root, args).map(|_| ())
}
