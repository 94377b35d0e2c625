pub mod assistant;
pub mod cache;
pub mod config;
pub mod git;
pub mod interpreter;
pub mod repo;
pub mod session;
pub mod util;
pub mod watcher;
