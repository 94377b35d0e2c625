//! Git status query functions
//!
//! Uses `git status --porcelain=v1 -b -z`: the `##` header carries branch and
//! upstream tracking counts, the remaining records carry the changed entries.

use std::path::Path;

use super::utils::*;

/// Get working tree status for a repository root
pub fn git_status(workspace_root: &Path) -> Result<GitStatusResult, GitError> {
    if get_git_repo_root(workspace_root).is_none() {
        return Err(GitError::NotAGitRepo);
    }

    let stdout = run_git(workspace_root, &["status", "--porcelain=v1", "-b", "-z"])?;
    Ok(parse_porcelain_status(&stdout))
}

/// Parse `git status --porcelain=v1 -b -z` output
///
/// Format: `## HEADER\0` then `XY PATH\0` or `XY NEW\0ORIG\0` for renames/copies.
pub(crate) fn parse_porcelain_status(output: &str) -> GitStatusResult {
    let mut result = GitStatusResult::default();
    let parts: Vec<&str> = output.split('\0').collect();

    let mut i = 0;
    while i < parts.len() {
        let part = parts[i];
        i += 1;

        if let Some(header) = part.strip_prefix("## ") {
            parse_branch_header(header, &mut result);
            continue;
        }

        if part.len() < 4 {
            continue;
        }

        let (Some(code), Some(path)) = (part.get(..2), part.get(3..)) else {
            continue;
        };
        let path = path.to_string();
        let mut xy = code.chars();
        let x = xy.next().unwrap_or(' ');
        let y = xy.next().unwrap_or(' ');
        let renamed = x == 'R' || x == 'C' || y == 'R' || y == 'C';

        // Rename/copy (index or worktree side): the original path follows as its own record
        let orig_path = if renamed && i < parts.len() && !parts[i].is_empty() {
            let orig = parts[i].to_string();
            i += 1;
            Some(orig)
        } else {
            None
        };

        result.entries.push(GitStatusEntry {
            path,
            code: code.to_string(),
            orig_path,
        });
    }

    result
}

/// Parse the `##` header line.
///
/// Examples:
/// - `main`
/// - `main...origin/main [ahead 1, behind 2]`
/// - `No commits yet on main` / `Initial commit on main`
/// - `HEAD (no branch)`
fn parse_branch_header(header: &str, result: &mut GitStatusResult) {
    let (refs, tracking) = match header.find(" [") {
        Some(pos) if header.ends_with(']') => (&header[..pos], &header[pos + 2..header.len() - 1]),
        _ => (header, ""),
    };

    if refs.starts_with("HEAD (no branch)") {
        result.branch = None;
    } else {
        let refs = refs
            .strip_prefix("No commits yet on ")
            .or_else(|| refs.strip_prefix("Initial commit on "))
            .unwrap_or(refs);
        match refs.split_once("...") {
            Some((local, upstream)) => {
                result.branch = Some(local.to_string());
                result.upstream = Some(upstream.to_string());
            }
            None => result.branch = Some(refs.to_string()),
        }
    }

    for item in tracking.split(", ") {
        if let Some(n) = item.strip_prefix("ahead ") {
            result.ahead = n.trim().parse().unwrap_or(0);
        } else if let Some(n) = item.strip_prefix("behind ") {
            result.behind = n.trim().parse().unwrap_or(0);
        }
    }
}
