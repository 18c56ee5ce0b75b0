//! Bulk account operations
//!
//! Each operation is an independent linear pass over the authenticated
//! user's repository list, applying one idempotent mutating call per
//! repository. A failure on one repository is logged and skipped; the pass
//! continues. None of these depend on the sync planner.

use tracing::{info, warn};

use crate::api::GithubApi;
use crate::error::Error;

/// Counters for one bulk pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub applied: usize,
    pub failed: usize,
}

/// Which idempotent call a bulk pass applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    EnableIssues,
    AddStars,
    WatchAll,
}

impl BulkOperation {
    pub fn describe(&self) -> &'static str {
        match self {
            BulkOperation::EnableIssues => "enable the issue tracker on",
            BulkOperation::AddStars => "star",
            BulkOperation::WatchAll => "watch",
        }
    }
}

/// Apply `operation` to every repository visible to the account
pub async fn run_bulk_operation<A: GithubApi>(
    api: &A,
    operation: BulkOperation,
) -> Result<BulkSummary, Error> {
    let repositories = api.list_repositories().await?;
    info!(
        "Will {} {} repositories",
        operation.describe(),
        repositories.len()
    );

    let mut summary = BulkSummary::default();

    for repo_info in repositories {
        let result = match operation {
            BulkOperation::EnableIssues => api.set_issues_enabled(&repo_info.repo, true).await,
            BulkOperation::AddStars => api.star(&repo_info.repo).await,
            BulkOperation::WatchAll => api.watch(&repo_info.repo).await,
        };

        match result {
            Ok(()) => summary.applied += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Skipping {}: {}", repo_info.full_name(), e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
