// Git module - thin wrappers around the system git binary
//
// This module is split into logical submodules:
// - utils: Common types, error type, and the git process runner
// - status: Working tree status (branch, ahead/behind, porcelain entries)
// - history: Log, diff, show, blame and raw pass-through
// - branches: Branch management (list, switch, create)
// - commit: Commit and the remaining mutating operations (pull, push, stash, reset, revert)
//
// All functions here are synchronous; async callers go through `repo::GitRepository`.

pub mod branches;
pub mod commit;
pub mod history;
pub mod status;
pub mod utils;

pub use branches::*;
pub use commit::*;
pub use history::*;
pub use status::*;
pub use utils::*;
