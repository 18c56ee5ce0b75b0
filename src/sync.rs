//! Run loop - sequential processing of repository entries
//!
//! Entries are processed strictly in config-file order, one at a time, one
//! branch mapping at a time. The loop is bounded by the maximum-repositories
//! limit, checks the cooperative cancel flag between entries, and commits the
//! resume index only after an entry's work has fully completed. A fatal error
//! leaves the session at its last committed value so a rerun resumes
//! correctly.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::api::GithubApi;
use crate::config::RepositoryEntry;
use crate::planner::SyncPlanner;
use crate::report::Report;
use crate::session::SessionStore;

/// Results of one invocation of the run loop
#[derive(Debug)]
pub struct RunSummary {
    /// Entries processed by this invocation (resumed entries not included)
    pub entries_processed: usize,
    /// Whether the loop stopped early because of a cancel request
    pub cancelled: bool,
    pub report: Report,
}

/// Drives the planner over the configured entries with resume support
pub struct SyncRunner<A> {
    planner: SyncPlanner<A>,
    session: SessionStore,
    /// Maximum entries to process this invocation, 0 meaning unlimited
    max_repositories: usize,
    cancel_flag: Arc<AtomicBool>,
}

impl<A: GithubApi> SyncRunner<A> {
    pub fn new(
        planner: SyncPlanner<A>,
        session: SessionStore,
        max_repositories: usize,
        cancel_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            planner,
            session,
            max_repositories,
            cancel_flag,
        }
    }

    /// Process entries in declared order, resuming after the last committed one
    pub async fn run(&self, entries: &[RepositoryEntry]) -> Result<RunSummary> {
        let state = self.session.load()?;
        let start = state.last_completed_index.min(entries.len());
        let total = entries.len();

        if start > 0 {
            info!("Resuming after entry {} of {}", start, total);
        }

        let mut report = Report::default();
        let mut processed = 0usize;
        let mut cancelled = false;
        let mut last_position = start;

        for (index, entry) in entries.iter().enumerate().skip(start) {
            if self.max_repositories > 0 && processed >= self.max_repositories {
                info!(
                    "Reached maximum of {} repositories, stopping",
                    self.max_repositories
                );
                break;
            }

            if self.cancel_flag.load(Ordering::SeqCst) {
                info!("Cancel requested, stopping before entry {}", index + 1);
                cancelled = true;
                break;
            }

            let position = index + 1;
            info!(
                "{:3} ({}) of {} ... {}",
                position,
                report.created_count(),
                total,
                entry.name
            );

            // A fatal error propagates here before the session is advanced,
            // so a rerun retries this entry.
            let outcomes = self.planner.plan_entry(entry).await?;

            for outcome in &outcomes {
                report.record(&entry.name, outcome);
            }

            processed += 1;
            last_position = position;
            self.session.save(position)?;
        }

        // A completed pass owes the next invocation a fresh start
        if !cancelled && last_position >= total {
            self.session.reset()?;
        }

        Ok(RunSummary {
            entries_processed: processed,
            cancelled,
            report,
        })
    }
}
