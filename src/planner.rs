//! Sync planner - decides, per branch mapping, whether a pull request is needed
//!
//! For each mapping of a repository entry the planner reads both branch tips,
//! checks ancestry, checks for an already-open pull request, and only then
//! issues the create call. Creation is the single mutating call in the sync
//! path and is skipped entirely in dry-run mode.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::GithubApi;
use crate::config::{BranchMapping, RepositoryEntry};
use crate::error::Error;

/// Label attached to every pull request this tool opens
pub const SYNC_LABEL: &str = "backstroke";

/// How long to wait before the single rate-limit retry
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(30);

/// Outcome of evaluating one branch mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// Fork tip already contains the upstream tip
    UpToDate,
    /// A pull request was opened
    Created { number: u64 },
    /// An open pull request for this mapping already exists
    AlreadyOpen { number: u64 },
    /// Dry-run: a pull request would have been opened
    WouldCreate,
}

/// One branch mapping together with its decision or recorded error
#[derive(Debug)]
pub struct MappingOutcome {
    pub mapping: BranchMapping,
    pub result: Result<SyncDecision, Error>,
}

/// Plans and executes synchronization for one repository entry at a time
pub struct SyncPlanner<A> {
    api: Arc<A>,
    dry_run: bool,
    retry_delay: Duration,
}

impl<A: GithubApi> SyncPlanner<A> {
    pub fn new(api: Arc<A>, dry_run: bool) -> Self {
        Self {
            api,
            dry_run,
            retry_delay: RATE_LIMIT_BACKOFF,
        }
    }

    /// Override the rate-limit backoff (tests use `Duration::ZERO`)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Evaluate every mapping of an entry, in declared order
    ///
    /// Non-fatal errors are recorded per mapping and do not stop the
    /// remaining mappings. An authentication failure is returned as `Err`
    /// and aborts the whole run.
    pub async fn plan_entry(&self, entry: &RepositoryEntry) -> Result<Vec<MappingOutcome>, Error> {
        let mut outcomes = Vec::with_capacity(entry.mappings.len());

        for mapping in &entry.mappings {
            let result = self.sync_mapping_with_retry(entry, mapping).await;

            match &result {
                Ok(decision) => {
                    debug!(
                        "{}: {} -> {}: {:?}",
                        entry.name, mapping.upstream_branch, mapping.fork_branch, decision
                    );
                }
                Err(e) if e.is_fatal() => return Err(e.clone()),
                Err(e) => {
                    warn!(
                        "{}: {} -> {}: {}",
                        entry.name, mapping.upstream_branch, mapping.fork_branch, e
                    );
                }
            }

            outcomes.push(MappingOutcome {
                mapping: mapping.clone(),
                result,
            });
        }

        Ok(outcomes)
    }

    async fn sync_mapping_with_retry(
        &self,
        entry: &RepositoryEntry,
        mapping: &BranchMapping,
    ) -> Result<SyncDecision, Error> {
        match self.sync_mapping(entry, mapping).await {
            Err(Error::RateLimit(msg)) => {
                warn!(
                    "{}: rate limited ({}), retrying once in {:?}",
                    entry.name, msg, self.retry_delay
                );
                tokio::time::sleep(self.retry_delay).await;
                // The open-PR check runs again here, so a create that landed
                // before the rate-limit response is not repeated.
                self.sync_mapping(entry, mapping).await
            }
            other => other,
        }
    }

    async fn sync_mapping(
        &self,
        entry: &RepositoryEntry,
        mapping: &BranchMapping,
    ) -> Result<SyncDecision, Error> {
        let upstream_tip = self
            .api
            .branch_head(&entry.upstream, &mapping.upstream_branch)
            .await?;
        let fork_tip = self
            .api
            .branch_head(&entry.fork, &mapping.fork_branch)
            .await?;

        if self
            .api
            .is_ancestor(&entry.fork, &upstream_tip, &fork_tip)
            .await?
        {
            return Ok(SyncDecision::UpToDate);
        }

        if let Some(number) = self
            .api
            .find_open_pull_request(
                &entry.fork,
                &entry.upstream.owner,
                &mapping.upstream_branch,
                &mapping.fork_branch,
            )
            .await?
        {
            return Ok(SyncDecision::AlreadyOpen { number });
        }

        if self.dry_run {
            return Ok(SyncDecision::WouldCreate);
        }

        let number = self
            .api
            .create_pull_request(
                &entry.fork,
                &entry.upstream.owner,
                &mapping.upstream_branch,
                &mapping.fork_branch,
                &pr_title(entry, mapping),
                &pr_body(entry, mapping),
            )
            .await?;

        // Labeling is best effort, a missing label must not fail the mapping
        if let Err(e) = self.api.add_label(&entry.fork, number, SYNC_LABEL).await {
            warn!("{}: could not label pull request #{}: {}", entry.name, number, e);
        }

        Ok(SyncDecision::Created { number })
    }
}

fn upstream_spec(entry: &RepositoryEntry, mapping: &BranchMapping) -> String {
    format!(
        "{}/{}@{}",
        entry.upstream.owner, entry.upstream.name, mapping.upstream_branch
    )
}

fn pr_title(entry: &RepositoryEntry, mapping: &BranchMapping) -> String {
    format!("Update from {}", upstream_spec(entry, mapping))
}

fn pr_body(entry: &RepositoryEntry, mapping: &BranchMapping) -> String {
    format!(
        "The upstream repository `{}` has some new changes that aren't in this fork.\n\
         So, here they are, ready to be merged!\n\n\
         This Pull Request was created programmatically by \
         [forksync](https://github.com/MKSG-MugunthKumar/forksync).",
        upstream_spec(entry, mapping)
    )
}
