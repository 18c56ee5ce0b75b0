//! Human-readable result reporting
//!
//! Results are grouped by outcome and printed once at the end of a run, the
//! same grouping the tool's log-scraping predecessors used: created, already
//! open, nothing to merge, and errors.

use tracing::warn;

use crate::api::GithubApi;
use crate::config::RepositoryEntry;
use crate::error::Error;
use crate::planner::{MappingOutcome, SyncDecision};

/// Accumulated per-mapping results for one run
#[derive(Debug, Default)]
pub struct Report {
    created: Vec<String>,
    already_open: Vec<String>,
    up_to_date: Vec<String>,
    would_create: Vec<String>,
    errors: Vec<String>,
}

impl Report {
    /// File a mapping outcome under its result category
    pub fn record(&mut self, section: &str, outcome: &MappingOutcome) {
        let label = format!(
            "{} ({} -> {})",
            section, outcome.mapping.upstream_branch, outcome.mapping.fork_branch
        );

        match &outcome.result {
            Ok(SyncDecision::Created { number }) => self.created.push(format!("{} #{}", label, number)),
            Ok(SyncDecision::AlreadyOpen { number }) => {
                self.already_open.push(format!("{} #{}", label, number))
            }
            Ok(SyncDecision::UpToDate) => self.up_to_date.push(label),
            Ok(SyncDecision::WouldCreate) => self.would_create.push(label),
            Err(e) => self.errors.push(format!("{}: {}", label, e)),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn already_open_count(&self) -> usize {
        self.already_open.len()
    }

    pub fn up_to_date_count(&self) -> usize {
        self.up_to_date.len()
    }

    pub fn would_create_count(&self) -> usize {
        self.would_create.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Print the grouped report to stdout
    pub fn print(&self) {
        println!("\nRepositories results:");

        let sections: [(&str, &Vec<String>); 5] = [
            ("✅ Successfully created", &self.created),
            ("🔁 A pull request already exists", &self.already_open),
            ("💤 No commits between fork and upstream", &self.up_to_date),
            ("🔍 Would create (dry run)", &self.would_create),
            ("❌ Errors", &self.errors),
        ];

        for (title, items) in sections {
            println!("\n    {}", title);

            if items.is_empty() {
                println!("        No results.");
            } else {
                for (index, item) in items.iter().enumerate() {
                    println!("        {}. {}", index + 1, item);
                }
            }
        }
    }
}

/// An open sync pull request found on one of the account's repositories
#[derive(Debug, Clone)]
pub struct OpenSyncPr {
    pub upstream_branch: String,
    pub fork_branch: String,
    pub number: u64,
}

/// Sync status of one repository visible to the token's account
#[derive(Debug)]
pub struct SyncedStatus {
    pub full_name: String,
    /// Whether the config file tracks this repository as a fork
    pub tracked: bool,
    pub open_prs: Vec<OpenSyncPr>,
}

/// List every repository visible to the account and whether it currently has
/// an open pull request matching a tracked upstream mapping
///
/// This walk must see the complete repository set to be correct, which is why
/// the caller discards any resumed partial run state before invoking it.
pub async fn synced_repositories<A: GithubApi>(
    api: &A,
    entries: &[RepositoryEntry],
) -> Result<Vec<SyncedStatus>, Error> {
    let repositories = api.list_repositories().await?;
    let mut statuses = Vec::with_capacity(repositories.len());

    for repo_info in repositories {
        let full_name = repo_info.full_name();
        let entry = entries.iter().find(|e| e.fork.to_string() == full_name);

        let Some(entry) = entry else {
            statuses.push(SyncedStatus {
                full_name,
                tracked: false,
                open_prs: Vec::new(),
            });
            continue;
        };

        let mut open_prs = Vec::new();
        for mapping in &entry.mappings {
            match api
                .find_open_pull_request(
                    &entry.fork,
                    &entry.upstream.owner,
                    &mapping.upstream_branch,
                    &mapping.fork_branch,
                )
                .await
            {
                Ok(Some(number)) => open_prs.push(OpenSyncPr {
                    upstream_branch: mapping.upstream_branch.clone(),
                    fork_branch: mapping.fork_branch.clone(),
                    number,
                }),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        "{}: could not query pull requests for {} -> {}: {}",
                        full_name, mapping.upstream_branch, mapping.fork_branch, e
                    );
                }
            }
        }

        statuses.push(SyncedStatus {
            full_name,
            tracked: true,
            open_prs,
        });
    }

    Ok(statuses)
}
