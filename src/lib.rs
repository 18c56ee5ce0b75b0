//! forksync - keep forked repositories in sync with their upstreams
//!
//! forksync reads a list of fork/upstream repository pairs from an INI-like
//! configuration file and opens a pull request on each fork branch that has
//! fallen behind its upstream branch, skipping branches that are already up
//! to date or already have an open sync pull request.
//!
//! ## Core Features
//!
//! - **Sync planning**: ancestry-aware decisions, idempotent across reruns
//! - **Resume support**: a crashed run continues after the last finished entry
//! - **Dry run**: report what would happen without opening pull requests
//! - **Bulk operations**: enable issues, star, or watch all repositories
//!
//! ## Modules
//!
//! - [`config`]: repository list parsing
//! - [`planner`]: per-branch pull request decisions
//! - [`github`]: GitHub API integration and authentication

pub mod api;
pub mod bulk;
pub mod config;
pub mod error;
pub mod github;
pub mod planner;
pub mod report;
pub mod session;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{GithubApi, RepoInfo, RepoRef};
pub use bulk::{run_bulk_operation, BulkOperation, BulkSummary};
pub use config::{BranchMapping, RepositoryEntry};
pub use error::Error;
pub use github::{resolve_token, GitHubClient};
pub use planner::{SyncDecision, SyncPlanner};
pub use report::Report;
pub use session::SessionStore;
pub use sync::{RunSummary, SyncRunner};
