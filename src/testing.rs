//! In-memory fake of the GitHub API for unit tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::{GithubApi, RepoInfo, RepoRef};
use crate::error::Error;

/// A pull request recorded by [`FakeApi::create_pull_request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CreatedPr {
    pub repo: String,
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
    pub number: u64,
}

#[derive(Default)]
struct FakeState {
    branch_heads: HashMap<(String, String), String>,
    ancestors: HashSet<(String, String)>,
    open_prs: HashMap<(String, String, String), u64>,
    created: Vec<CreatedPr>,
    labels: Vec<(String, u64, String)>,
    repositories: Vec<RepoInfo>,
    issues_enabled: Vec<String>,
    starred: Vec<String>,
    watched: Vec<String>,
    next_pr_number: u64,
    rate_limited_heads: usize,
    auth_failed: bool,
    label_failure: bool,
    failing_repos: HashSet<String>,
    cancel_on_head: Option<(String, Arc<AtomicBool>)>,
}

/// Scriptable [`GithubApi`] implementation backed by hash maps
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_pr_number: 101,
                ..FakeState::default()
            }),
        }
    }

    pub fn set_branch_head(&self, repo: &str, branch: &str, sha: &str) {
        self.state
            .lock()
            .unwrap()
            .branch_heads
            .insert((repo.to_string(), branch.to_string()), sha.to_string());
    }

    /// Declare that `ancestor` is reachable from `descendant`
    pub fn set_ancestor(&self, ancestor: &str, descendant: &str) {
        self.state
            .lock()
            .unwrap()
            .ancestors
            .insert((ancestor.to_string(), descendant.to_string()));
    }

    pub fn set_open_pull_request(&self, repo: &str, head: &str, base: &str, number: u64) {
        self.state.lock().unwrap().open_prs.insert(
            (repo.to_string(), head.to_string(), base.to_string()),
            number,
        );
    }

    pub fn add_repository(&self, owner: &str, name: &str, is_fork: bool) {
        self.state.lock().unwrap().repositories.push(RepoInfo {
            repo: RepoRef::new(owner, name),
            is_fork,
        });
    }

    /// Make the next `count` branch-head reads answer with a rate limit
    pub fn rate_limit_next_heads(&self, count: usize) {
        self.state.lock().unwrap().rate_limited_heads = count;
    }

    pub fn fail_all_with_authentication_error(&self) {
        self.state.lock().unwrap().auth_failed = true;
    }

    pub fn fail_labels(&self) {
        self.state.lock().unwrap().label_failure = true;
    }

    /// Make every mutating bulk call against `repo` fail with a network error
    pub fn fail_repo(&self, repo: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_repos
            .insert(repo.to_string());
    }

    /// Set `flag` when a branch head of `repo` is read, to simulate a cancel
    /// request arriving while that entry is in flight
    pub fn cancel_when_head_read(&self, repo: &str, flag: Arc<AtomicBool>) {
        self.state.lock().unwrap().cancel_on_head = Some((repo.to_string(), flag));
    }

    pub fn created_pull_requests(&self) -> Vec<CreatedPr> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn labels(&self) -> Vec<(String, u64, String)> {
        self.state.lock().unwrap().labels.clone()
    }

    pub fn issues_enabled(&self) -> Vec<String> {
        self.state.lock().unwrap().issues_enabled.clone()
    }

    pub fn starred(&self) -> Vec<String> {
        self.state.lock().unwrap().starred.clone()
    }

    pub fn watched(&self) -> Vec<String> {
        self.state.lock().unwrap().watched.clone()
    }

    fn check_auth(state: &FakeState) -> Result<(), Error> {
        if state.auth_failed {
            Err(Error::Authentication("bad credentials".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_repo(state: &FakeState, repo: &RepoRef) -> Result<(), Error> {
        if state.failing_repos.contains(&repo.to_string()) {
            Err(Error::Network(format!("connection reset for {}", repo)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GithubApi for FakeApi {
    async fn branch_head(&self, repo: &RepoRef, branch: &str) -> Result<String, Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_auth(&state)?;

        if let Some((target, flag)) = &state.cancel_on_head {
            if *target == repo.to_string() {
                flag.store(true, Ordering::SeqCst);
            }
        }

        if state.rate_limited_heads > 0 {
            state.rate_limited_heads -= 1;
            return Err(Error::RateLimit("API rate limit exceeded".to_string()));
        }

        state
            .branch_heads
            .get(&(repo.to_string(), branch.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} branch {}", repo, branch)))
    }

    async fn is_ancestor(
        &self,
        _repo: &RepoRef,
        ancestor: &str,
        descendant: &str,
    ) -> Result<bool, Error> {
        let state = self.state.lock().unwrap();
        Self::check_auth(&state)?;

        Ok(ancestor == descendant
            || state
                .ancestors
                .contains(&(ancestor.to_string(), descendant.to_string())))
    }

    async fn find_open_pull_request(
        &self,
        repo: &RepoRef,
        head_owner: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<Option<u64>, Error> {
        let state = self.state.lock().unwrap();
        Self::check_auth(&state)?;

        let head = format!("{}:{}", head_owner, head_branch);
        Ok(state
            .open_prs
            .get(&(repo.to_string(), head, base_branch.to_string()))
            .copied())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        head_owner: &str,
        head_branch: &str,
        base_branch: &str,
        title: &str,
        body: &str,
    ) -> Result<u64, Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_auth(&state)?;
        Self::check_repo(&state, repo)?;

        let number = state.next_pr_number;
        state.next_pr_number += 1;

        let head = format!("{}:{}", head_owner, head_branch);
        state.open_prs.insert(
            (repo.to_string(), head.clone(), base_branch.to_string()),
            number,
        );
        state.created.push(CreatedPr {
            repo: repo.to_string(),
            head,
            base: base_branch.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            number,
        });

        Ok(number)
    }

    async fn add_label(&self, repo: &RepoRef, number: u64, label: &str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_auth(&state)?;

        if state.label_failure {
            return Err(Error::Network("label service unavailable".to_string()));
        }

        state
            .labels
            .push((repo.to_string(), number, label.to_string()));
        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<RepoInfo>, Error> {
        let state = self.state.lock().unwrap();
        Self::check_auth(&state)?;
        Ok(state.repositories.clone())
    }

    async fn set_issues_enabled(&self, repo: &RepoRef, enabled: bool) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_auth(&state)?;
        Self::check_repo(&state, repo)?;

        if enabled {
            state.issues_enabled.push(repo.to_string());
        }
        Ok(())
    }

    async fn star(&self, repo: &RepoRef) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_auth(&state)?;
        Self::check_repo(&state, repo)?;

        state.starred.push(repo.to_string());
        Ok(())
    }

    async fn watch(&self, repo: &RepoRef) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        Self::check_auth(&state)?;
        Self::check_repo(&state, repo)?;

        state.watched.push(repo.to_string());
        Ok(())
    }
}
