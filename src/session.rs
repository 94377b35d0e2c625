//! Chat session
//!
//! Binds the interpreter to at most one repository. Turns against the same
//! root are serialized through `RepoLocks`; mutating commands invalidate the
//! root's cached status and schedule a background refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::cache::StatusCache;
use crate::interpreter::{grammar, CommandResult, Interpreter, ParseOutcome};
use crate::repo::{resolve_repository_root, GitRepository, Repository, RepositoryRoot};

/// Per-root turn locks, shared between sessions
#[derive(Clone, Default)]
pub struct RepoLocks {
    locks: Arc<Mutex<HashMap<RepositoryRoot, Arc<tokio::sync::Mutex<()>>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, root: &RepositoryRoot) -> Arc<tokio::sync::Mutex<()>> {
        match self.locks.lock() {
            Ok(mut locks) => locks.entry(root.clone()).or_default().clone(),
            // 锁中毒时退化为不共享的锁
            Err(_) => Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub sender: Sender,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Append-only record of the conversation; cleared only on request
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

pub struct ChatSession {
    interpreter: Interpreter,
    repo: Option<Arc<dyn Repository>>,
    cache: Option<StatusCache>,
    locks: RepoLocks,
}

impl ChatSession {
    pub fn new(interpreter: Interpreter, repo: Option<Arc<dyn Repository>>) -> Self {
        Self {
            interpreter,
            repo,
            cache: None,
            locks: RepoLocks::new(),
        }
    }

    /// Session bound to the repository containing `path`, if any
    pub fn open(interpreter: Interpreter, path: &Path) -> Self {
        let repo = GitRepository::discover(path).map(|r| Arc::new(r) as Arc<dyn Repository>);
        Self::new(interpreter, repo)
    }

    pub fn with_cache(mut self, cache: StatusCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_locks(mut self, locks: RepoLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn repository(&self) -> Option<&Arc<dyn Repository>> {
        self.repo.as_ref()
    }

    pub fn root(&self) -> Option<&RepositoryRoot> {
        self.repo.as_ref().map(|r| r.root())
    }

    /// Re-resolve the bound repository from a new active path.
    /// Returns true when the bound root changed.
    pub fn rebind(&mut self, path: &Path) -> bool {
        let resolved = resolve_repository_root(path);
        if resolved.as_ref() == self.root() {
            return false;
        }
        match &resolved {
            Some(root) => info!("Session bound to {}", root),
            None => info!("Session unbound, no repository at {}", path.display()),
        }
        self.repo = resolved.map(|root| Arc::new(GitRepository::new(root)) as Arc<dyn Repository>);
        true
    }

    /// Handle one chat line
    pub async fn submit(&self, text: &str) -> CommandResult {
        let outcome = grammar::parse(text);

        let Some(repo) = self.repo.as_deref() else {
            return self.interpreter.dispatch(&outcome, None).await;
        };

        let lock = self.locks.lock_for(repo.root());
        let _turn = lock.lock().await;

        let result = self.interpreter.dispatch(&outcome, Some(repo)).await;

        if let (ParseOutcome::Command(cmd), Some(cache)) = (&outcome, &self.cache) {
            if cmd.is_mutating() {
                debug!("{} may have changed {}, refreshing status", cmd.name(), repo.root());
                cache.invalidate(repo.root());
                cache.spawn_refresh(repo.root().clone());
            }
        }

        result
    }
}
