//! Repository discovery and the async handle the interpreter talks to

pub mod context;
pub mod handle;
pub mod root;

#[cfg(test)]
pub(crate) mod fake;

pub use context::RepositoryContext;
pub use handle::{GitRepository, Repository};
pub use root::{resolve_repository_root, RepositoryRoot, REPO_MARKER};
