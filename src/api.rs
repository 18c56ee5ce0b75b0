//! GitHub API abstraction layer
//!
//! This module defines the narrow interface the rest of the tool consumes.
//! The real implementation lives in [`crate::github`]; tests substitute an
//! in-memory fake so planner and run-loop logic can be exercised without a
//! network.

use async_trait::async_trait;
use std::fmt;

use crate::error::Error;

/// An owner/name pair identifying a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Minimal repository record returned by [`GithubApi::list_repositories`]
#[derive(Debug, Clone)]
pub struct RepoInfo {
    pub repo: RepoRef,
    pub is_fork: bool,
}

impl RepoInfo {
    pub fn full_name(&self) -> String {
        self.repo.to_string()
    }
}

/// Narrow GitHub API surface consumed by the planner and bulk operations
///
/// All reads are safe to repeat. `create_pull_request` is the only mutating
/// call in the sync path and is attempted at most once per mapping per run.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// Latest commit id of a branch
    async fn branch_head(&self, repo: &RepoRef, branch: &str) -> Result<String, Error>;

    /// Whether `ancestor` equals `descendant` or is reachable from it
    ///
    /// Both commits must exist in `repo`'s commit graph.
    async fn is_ancestor(
        &self,
        repo: &RepoRef,
        ancestor: &str,
        descendant: &str,
    ) -> Result<bool, Error>;

    /// Number of an open pull request from `head_owner:head_branch` into
    /// `base_branch` of `repo`, if one exists
    async fn find_open_pull_request(
        &self,
        repo: &RepoRef,
        head_owner: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<Option<u64>, Error>;

    /// Open a pull request and return its number
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        head_owner: &str,
        head_branch: &str,
        base_branch: &str,
        title: &str,
        body: &str,
    ) -> Result<u64, Error>;

    /// Attach a label to an existing pull request
    async fn add_label(&self, repo: &RepoRef, number: u64, label: &str) -> Result<(), Error>;

    /// All repositories visible to the authenticated user
    async fn list_repositories(&self) -> Result<Vec<RepoInfo>, Error>;

    /// Toggle the issue tracker on a repository
    async fn set_issues_enabled(&self, repo: &RepoRef, enabled: bool) -> Result<(), Error>;

    /// Star a repository for the authenticated user
    async fn star(&self, repo: &RepoRef) -> Result<(), Error>;

    /// Subscribe the authenticated user to a repository's notifications
    async fn watch(&self, repo: &RepoRef) -> Result<(), Error>;
}
