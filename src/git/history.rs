//! Git history and content queries
//!
//! Provides log, working tree diff, show, single-line blame and a raw pass-through.

use std::path::Path;

use super::utils::*;

/// Get git log (commit history), newest first
///
/// Uses `git log --pretty=format:...` with NUL field separators and a record separator,
/// so subjects containing any printable text parse safely.
pub fn git_log(workspace_root: &Path, limit: usize) -> Result<Vec<GitLogEntry>, GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }

    // %H=full sha, %s=subject, %an=author, %aI=ISO date, %x1e=record separator
    let format = "%H%x00%s%x00%an%x00%aI%x1e";

    let output = git_command(workspace_root)
        .args([
            "log",
            &format!("--pretty=format:{}", format),
            &format!("-{}", limit),
        ])
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // 没有任何提交时返回空列表
        if stderr.contains("does not have any commits") {
            return Ok(vec![]);
        }
        return Err(GitError::CommandFailed(stderr.trim().to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_log_records(&stdout))
}

fn parse_log_records(stdout: &str) -> Vec<GitLogEntry> {
    let mut entries = Vec::new();

    for record in stdout.split('\x1e') {
        let record = record.trim_matches(|c| c == '\n' || c == '\r');
        if record.is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.split('\x00').collect();
        if fields.len() >= 4 {
            entries.push(GitLogEntry {
                sha: fields[0].to_string(),
                message: fields[1].to_string(),
                author: fields[2].to_string(),
                date: fields[3].to_string(),
            });
        }
    }

    entries
}

/// Full working tree diff (`git diff`, unstaged changes against the index)
pub fn git_diff(workspace_root: &Path) -> Result<String, GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }
    run_git(workspace_root, &["diff"])
}

/// Raw `git show <reference>` output
pub fn git_show(workspace_root: &Path, reference: &str) -> Result<String, GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }
    validate_ref(reference)?;
    run_git(workspace_root, &["show", reference])
}

/// Single-line blame for a 1-based `line` of `path` (relative to `workspace_root`)
pub fn git_blame_line(workspace_root: &Path, path: &str, line: u32) -> Result<String, GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }
    if line == 0 {
        return Err(GitError::InvalidArgument(
            "line numbers start at 1".to_string(),
        ));
    }

    let range = format!("{},{}", line, line);
    run_git(workspace_root, &["blame", "-L", &range, "--", path])
}

/// Pass arbitrary arguments straight to git
pub fn git_raw(workspace_root: &Path, args: &[String]) -> Result<String, GitError> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_git(workspace_root, &args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_records() {
        let stdout = "aaaaaaaaaaaa\x00Fix: parser, again\x00Ada\x002024-01-02T03:04:05+00:00\x1e\n\
                      bbbbbbbbbbbb\x00Initial\x00Linus\x002024-01-01T00:00:00+00:00\x1e";
        let entries = parse_log_records(stdout);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].short_sha(), "aaaaaaa");
        assert_eq!(entries[0].message, "Fix: parser, again");
        assert_eq!(entries[0].author, "Ada");
        assert_eq!(entries[1].message, "Initial");
    }

    #[test]
    fn test_parse_log_skips_incomplete_records() {
        let entries = parse_log_records("deadbeef\x00only-subject\x1e");
        assert!(entries.is_empty());
    }
}
