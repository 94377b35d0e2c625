//! Repository context shown at the top of a chat session

use serde::Serialize;

use crate::git::{GitLogEntry, GitStatusResult};

/// One-shot snapshot of where the user is: repository, branch, last commit, pending changes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryContext {
    pub name: String,
    pub branch: String,
    pub last_commit: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub changes: usize,
    pub conflicted: usize,
    pub remote: Option<String>,
}

impl RepositoryContext {
    pub fn from_parts(
        name: String,
        status: &GitStatusResult,
        last: Option<GitLogEntry>,
        remote: Option<String>,
    ) -> Self {
        let (last_commit, author, date) = match last {
            Some(entry) => (Some(entry.message), Some(entry.author), Some(entry.date)),
            None => (None, None, None),
        };

        Self {
            name,
            branch: status.branch.clone().unwrap_or_else(|| "HEAD".to_string()),
            last_commit,
            author,
            date,
            changes: status.entries.len(),
            conflicted: status.conflicted_count(),
            remote,
        }
    }

    /// `Repo: <name> | Branch: <branch> | Last: <subject> (<author>)`
    pub fn headline(&self) -> String {
        format!(
            "Repo: {} | Branch: {} | Last: {} ({})",
            self.name,
            self.branch,
            self.last_commit.as_deref().unwrap_or(""),
            self.author.as_deref().unwrap_or("")
        )
    }
}
