//! Reply text for repository commands

use crate::git::{GitBranchesResult, GitLogEntry, GitStatusResult};

/// `diff` and `show` replies are cut to this many characters
pub const OUTPUT_LIMIT: usize = 2000;

pub const NO_DIFF: &str = "No diff.";
pub const NO_COMMITS: &str = "No commits yet.";

/// First `limit` characters of `text` (not bytes)
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn status(status: &GitStatusResult) -> String {
    format!(
        "On branch: {}\nStaged: {}\nChanged: {}\nConflicted: {}",
        status.branch.as_deref().unwrap_or("HEAD"),
        status.staged_count(),
        status.entries.len(),
        status.conflicted_count()
    )
}

/// One line per commit, newest first, as git returned them
pub fn log(entries: &[GitLogEntry]) -> String {
    if entries.is_empty() {
        return NO_COMMITS.to_string();
    }
    entries
        .iter()
        .map(|e| format!("{}: {} ({})", e.short_sha(), e.message, e.author))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn branches(result: &GitBranchesResult) -> String {
    format!(
        "Branches:\n{}\nCurrent: {}",
        result.branches.join(", "),
        result.current
    )
}

pub fn diff(text: &str) -> String {
    if text.is_empty() {
        return NO_DIFF.to_string();
    }
    truncate_chars(text, OUTPUT_LIMIT).to_string()
}

pub fn show(text: &str) -> String {
    truncate_chars(text, OUTPUT_LIMIT).to_string()
}

/// `None` unless the branch is behind its upstream
pub fn merge_required(status: &GitStatusResult) -> Option<String> {
    (status.behind > 0).then(|| format!("Behind by {} commits. Merge required.", status.behind))
}

pub fn merge_status(status: &GitStatusResult) -> String {
    if let Some(line) = merge_required(status) {
        return line;
    }
    match status.upstream {
        Some(_) => "Up to date with upstream.".to_string(),
        None => "No upstream configured.".to_string(),
    }
}
