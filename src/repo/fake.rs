//! In-memory repository used by interpreter and session tests

use async_trait::async_trait;
use std::sync::Mutex;

use crate::git::{GitBranchesResult, GitError, GitLogEntry, GitStatusResult};

use super::context::RepositoryContext;
use super::handle::Repository;
use super::root::RepositoryRoot;

pub(crate) struct FakeRepository {
    root: RepositoryRoot,
    pub status: GitStatusResult,
    pub log: Vec<GitLogEntry>,
    pub diff: String,
    pub show: String,
    pub blame: String,
    pub branches: GitBranchesResult,
    /// When set, every operation fails with this message
    pub fail: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeRepository {
    pub fn new(root: &str) -> Self {
        Self {
            root: RepositoryRoot::new(root),
            status: GitStatusResult::default(),
            log: Vec::new(),
            diff: String::new(),
            show: String::new(),
            blame: String::new(),
            branches: GitBranchesResult {
                current: "main".to_string(),
                branches: vec!["main".to_string()],
            },
            fail: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(root: &str, message: &str) -> Self {
        Self {
            fail: Some(message.to_string()),
            ..Self::new(root)
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record<T>(&self, call: String, value: T) -> Result<T, GitError> {
        self.calls.lock().unwrap().push(call);
        match &self.fail {
            Some(msg) => Err(GitError::CommandFailed(msg.clone())),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl Repository for FakeRepository {
    fn root(&self) -> &RepositoryRoot {
        &self.root
    }

    async fn status(&self) -> Result<GitStatusResult, GitError> {
        self.record("status".into(), self.status.clone())
    }

    async fn log(&self, limit: usize) -> Result<Vec<GitLogEntry>, GitError> {
        let entries = self.log.iter().take(limit).cloned().collect();
        self.record(format!("log:{}", limit), entries)
    }

    async fn diff(&self) -> Result<String, GitError> {
        self.record("diff".into(), self.diff.clone())
    }

    async fn pull(&self) -> Result<(), GitError> {
        self.record("pull".into(), ())
    }

    async fn push(&self) -> Result<(), GitError> {
        self.record("push".into(), ())
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.record(format!("commit:{}", message), ())
    }

    async fn branches(&self) -> Result<GitBranchesResult, GitError> {
        self.record("branch".into(), self.branches.clone())
    }

    async fn checkout(&self, name: &str) -> Result<(), GitError> {
        self.record(format!("checkout:{}", name), ())
    }

    async fn create_branch(&self, name: &str) -> Result<(), GitError> {
        self.record(format!("create-branch:{}", name), ())
    }

    async fn stash(&self) -> Result<(), GitError> {
        self.record("stash".into(), ())
    }

    async fn stash_pop(&self) -> Result<(), GitError> {
        self.record("stash pop".into(), ())
    }

    async fn stash_merge(&self) -> Result<bool, GitError> {
        let stashed = !self.status.entries.is_empty();
        self.record("stash-merge".into(), stashed)
    }

    async fn reset(&self) -> Result<(), GitError> {
        self.record("reset".into(), ())
    }

    async fn revert(&self, reference: &str) -> Result<(), GitError> {
        self.record(format!("revert:{}", reference), ())
    }

    async fn show(&self, reference: &str) -> Result<String, GitError> {
        self.record(format!("show:{}", reference), self.show.clone())
    }

    async fn blame(&self, file: &str, line: u32) -> Result<String, GitError> {
        self.record(format!("blame:{}:{}", file, line), self.blame.clone())
    }

    async fn raw(&self, args: Vec<String>) -> Result<String, GitError> {
        self.record(format!("raw:{}", args.join(" ")), String::new())
    }

    async fn context(&self) -> Result<RepositoryContext, GitError> {
        let ctx = RepositoryContext::from_parts(
            self.root.name(),
            &self.status,
            self.log.first().cloned(),
            None,
        );
        self.record("context".into(), ctx)
    }
}
