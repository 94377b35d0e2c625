//! Chat command interpreter
//!
//! Turns one chat line into a `CommandResult`: repository commands run against
//! the bound `Repository`, anything unrecognized goes to the assistant. No
//! repository or assistant error escapes; each one becomes a result value.

pub mod format;
pub mod grammar;

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::assistant::{AssistantGateway, ReviewRequest};
use crate::git::GitError;
use crate::repo::Repository;

pub use grammar::{parse, ParseOutcome, ParsedCommand};

pub const HELP_TEXT: &str = "Available commands:\n\
status, log, pull, push, commit <msg>, diff, branch, checkout <branch>, \
create-branch <name>, stash, stash pop, reset, revert <commit>, show <commit>, \
blame <file> <line>, merge-status, stash-merge, review [file], /help.\n\
Or ask a question for AI help.";

pub const NO_REPOSITORY: &str = "No git repository detected.";
pub const ASSISTANT_UNAVAILABLE: &str = "AI backend not available.";
pub const FAILURE_MARKER: &str = "❌ Error: ";
pub const NOTHING_TO_REVIEW: &str = "Nothing to review.";

/// Diffs this short (in characters) are reviewed from the named file instead
const TRIVIAL_DIFF_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Success(String),
    Failure(String),
    /// No repository is bound
    NotApplicable,
}

impl CommandResult {
    /// Text shown to the user
    pub fn text(&self) -> String {
        match self {
            CommandResult::Success(text) => text.clone(),
            CommandResult::Failure(reason) => format!("{}{}", FAILURE_MARKER, reason),
            CommandResult::NotApplicable => NO_REPOSITORY.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success(_))
    }
}

#[derive(Clone)]
pub struct Interpreter {
    assistant: Arc<dyn AssistantGateway>,
}

impl Interpreter {
    pub fn new(assistant: Arc<dyn AssistantGateway>) -> Self {
        Self { assistant }
    }

    /// Parse and run one line
    pub async fn interpret(&self, raw: &str, repo: Option<&dyn Repository>) -> CommandResult {
        self.dispatch(&parse(raw), repo).await
    }

    /// Run an already parsed line
    pub async fn dispatch(
        &self,
        outcome: &ParseOutcome,
        repo: Option<&dyn Repository>,
    ) -> CommandResult {
        let cmd = match outcome {
            ParseOutcome::Command(ParsedCommand::Help) => {
                return CommandResult::Success(HELP_TEXT.to_string())
            }
            ParseOutcome::Command(cmd) => cmd,
            ParseOutcome::Malformed { usage } => {
                return match repo {
                    Some(_) => CommandResult::Failure(format!("Usage: {}", usage)),
                    None => CommandResult::NotApplicable,
                };
            }
        };

        let Some(repo) = repo else {
            return CommandResult::NotApplicable;
        };

        debug!("Dispatching {} in {}", cmd.name(), repo.root());
        match self.execute(cmd, repo).await {
            Ok(result) => result,
            Err(e) => {
                debug!("{} failed in {}: {}", cmd.name(), repo.root(), e);
                CommandResult::Failure(format!("{} failed: {}", cmd.name(), e))
            }
        }
    }

    async fn execute(
        &self,
        cmd: &ParsedCommand,
        repo: &dyn Repository,
    ) -> Result<CommandResult, GitError> {
        let text = match cmd {
            ParsedCommand::Help => HELP_TEXT.to_string(),
            ParsedCommand::Status => format::status(&repo.status().await?),
            ParsedCommand::Log(count) => format::log(&repo.log(*count).await?),
            ParsedCommand::Pull => {
                repo.pull().await?;
                "✅ Pulled latest changes.".to_string()
            }
            ParsedCommand::Push => {
                repo.push().await?;
                "✅ Pushed changes.".to_string()
            }
            ParsedCommand::Commit(message) => {
                repo.commit(message).await?;
                format!("✅ Committed: {}", message)
            }
            ParsedCommand::Diff => format::diff(&repo.diff().await?),
            ParsedCommand::Branch => format::branches(&repo.branches().await?),
            ParsedCommand::Checkout(name) => {
                repo.checkout(name).await?;
                format!("✅ Checked out branch: {}", name)
            }
            ParsedCommand::CreateBranch(name) => {
                repo.create_branch(name).await?;
                format!("✅ Created and checked out branch: {}", name)
            }
            ParsedCommand::Stash => {
                repo.stash().await?;
                "✅ Stashed changes.".to_string()
            }
            ParsedCommand::StashPop => {
                repo.stash_pop().await?;
                "✅ Popped stash.".to_string()
            }
            ParsedCommand::Reset => {
                repo.reset().await?;
                "✅ Reset complete.".to_string()
            }
            ParsedCommand::Revert(reference) => {
                repo.revert(reference).await?;
                format!("✅ Reverted commit: {}", reference)
            }
            ParsedCommand::Show(reference) => format::show(&repo.show(reference).await?),
            ParsedCommand::Blame { file, line } => repo.blame(file, *line).await?,
            ParsedCommand::MergeStatus => format::merge_status(&repo.status().await?),
            ParsedCommand::StashMerge => {
                if repo.stash_merge().await? {
                    "✅ Stash, merge, and pop successful.".to_string()
                } else {
                    "✅ Merge successful.".to_string()
                }
            }
            ParsedCommand::Review(file) => self.review(repo, file.as_deref()).await?,
            ParsedCommand::FreeText(text) => self.ask(text).await,
        };
        Ok(CommandResult::Success(text))
    }

    /// Send the diff (or the file, when the diff is trivial) with repository context
    async fn review(&self, repo: &dyn Repository, file: Option<&str>) -> Result<String, GitError> {
        let diff = repo.diff().await?;
        let file_content = match file {
            Some(file) if diff.chars().count() <= TRIVIAL_DIFF_CHARS => {
                let path = repo.root().path().join(Path::new(file));
                tokio::fs::read_to_string(&path).await?
            }
            _ => diff,
        };
        if file_content.trim().is_empty() {
            return Ok(NOTHING_TO_REVIEW.to_string());
        }

        let request = ReviewRequest {
            file_content,
            repo_info: repo.context().await?,
        };
        match self.assistant.review(&request).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!("Review request failed: {}", e);
                Ok(ASSISTANT_UNAVAILABLE.to_string())
            }
        }
    }

    async fn ask(&self, text: &str) -> String {
        match self.assistant.ask(text).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Assistant request failed: {}", e);
                ASSISTANT_UNAVAILABLE.to_string()
            }
        }
    }
}
