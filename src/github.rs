//! GitHub client - octocrab-backed implementation of the API surface
//!
//! Authentication is a personal token, taken from `-t/--token` (which may
//! also name a file containing the token) or from the
//! `GITHUBPULLREQUESTS_TOKEN` environment variable.

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::api::{GithubApi, RepoInfo, RepoRef};
use crate::error::Error;

/// Environment variable consulted when no token argument is given
pub const TOKEN_ENV_VAR: &str = "GITHUBPULLREQUESTS_TOKEN";

/// GitHub client wrapper with authentication management
pub struct GitHubClient {
    client: Octocrab,
    username: String,
}

/// Resolve the personal token from the CLI argument, a token file, or the
/// environment
pub fn resolve_token(cli_token: Option<&str>) -> Result<String, Error> {
    if let Some(value) = cli_token {
        let expanded = shellexpand::full(value)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| value.to_string());

        // The argument may name a file holding the token
        if Path::new(&expanded).exists() {
            debug!("Reading GitHub token from file: {}", expanded);
            let content = std::fs::read_to_string(&expanded).map_err(|e| {
                Error::Authentication(format!("failed to read token file {}: {}", expanded, e))
            })?;
            return Ok(content.trim().to_string());
        }

        return Ok(value.trim().to_string());
    }

    match env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(Error::Authentication(format!(
            "No GitHub token found. Please either:\n\
             1. Pass a token (or a token file path) with -t/--token\n\
             2. Set the {} environment variable",
            TOKEN_ENV_VAR
        ))),
    }
}

/// Map an octocrab error onto the tool's error taxonomy
fn classify(err: octocrab::Error, context: &str) -> Error {
    match &err {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            let message = source.message.clone();

            match status {
                401 => Error::Authentication(format!("{}: {}", context, message)),
                404 => Error::NotFound(context.to_string()),
                429 => Error::RateLimit(format!("{}: {}", context, message)),
                403 if message.to_lowercase().contains("rate limit") => {
                    Error::RateLimit(format!("{}: {}", context, message))
                }
                _ => Error::Network(format!("{}: HTTP {} {}", context, status, message)),
            }
        }
        _ => Error::Network(format!("{}: {}", context, err)),
    }
}

/// Map a raw HTTP status onto the taxonomy, for endpoints called without a
/// typed response body
fn status_error(status: u16, context: &str) -> Error {
    match status {
        401 => Error::Authentication(format!("{}: HTTP 401", context)),
        404 => Error::NotFound(context.to_string()),
        403 | 429 => Error::RateLimit(format!("{}: HTTP {}", context, status)),
        _ => Error::Network(format!("{}: HTTP {}", context, status)),
    }
}

#[derive(Debug, Deserialize)]
struct BranchPayload {
    commit: CommitPayload,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ComparePayload {
    status: String,
}

impl GitHubClient {
    /// Create a client and verify the token by fetching the current user
    pub async fn new(token: String) -> Result<Self, Error> {
        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| Error::Network(format!("failed to create GitHub client: {}", e)))?;

        let user = client
            .current()
            .user()
            .await
            .map_err(|e| classify(e, "failed to get current user, check your token"))?;

        info!("Authenticated as GitHub user: {}", user.login);

        Ok(Self {
            client,
            username: user.login,
        })
    }

    /// Get the authenticated username
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[async_trait]
impl GithubApi for GitHubClient {
    async fn branch_head(&self, repo: &RepoRef, branch: &str) -> Result<String, Error> {
        debug!("Fetching branch head: {} {}", repo, branch);

        let payload: BranchPayload = self
            .client
            .get(
                format!("/repos/{}/{}/branches/{}", repo.owner, repo.name, branch),
                None::<&()>,
            )
            .await
            .map_err(|e| classify(e, &format!("{} branch {}", repo, branch)))?;

        Ok(payload.commit.sha)
    }

    async fn is_ancestor(
        &self,
        repo: &RepoRef,
        ancestor: &str,
        descendant: &str,
    ) -> Result<bool, Error> {
        if ancestor == descendant {
            return Ok(true);
        }

        let payload: ComparePayload = self
            .client
            .get(
                format!(
                    "/repos/{}/{}/compare/{}...{}",
                    repo.owner, repo.name, ancestor, descendant
                ),
                None::<&()>,
            )
            .await
            .map_err(|e| classify(e, &format!("{} compare {}...{}", repo, ancestor, descendant)))?;

        // The compare status describes the head relative to the base: when
        // the descendant is "ahead" of (or identical to) the ancestor, the
        // ancestor is contained in its history.
        Ok(matches!(payload.status.as_str(), "identical" | "ahead"))
    }

    async fn find_open_pull_request(
        &self,
        repo: &RepoRef,
        head_owner: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<Option<u64>, Error> {
        let head = format!("{}:{}", head_owner, head_branch);
        debug!("Looking for open PR in {}: {} -> {}", repo, head, base_branch);

        let page = self
            .client
            .pulls(&repo.owner, &repo.name)
            .list()
            .state(octocrab::params::State::Open)
            .head(head.clone())
            .base(base_branch)
            .per_page(1)
            .send()
            .await
            .map_err(|e| classify(e, &format!("{} list pull requests", repo)))?;

        Ok(page.items.first().map(|pr| pr.number))
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
        let head = format!("{}:{}", head_owner, head_branch);
        info!("Creating PR in {}: {} -> {}", repo, head, base_branch);

        let pr = self
            .client
            .pulls(&repo.owner, &repo.name)
            .create(title, head, base_branch)
            .body(body)
            .send()
            .await
            .map_err(|e| classify(e, &format!("{} create pull request", repo)))?;

        Ok(pr.number)
    }

    async fn add_label(&self, repo: &RepoRef, number: u64, label: &str) -> Result<(), Error> {
        self.client
            .issues(&repo.owner, &repo.name)
            .add_labels(number, &[label.to_string()])
            .await
            .map_err(|e| classify(e, &format!("{} label #{}", repo, number)))?;

        Ok(())
    }

    /// List all repositories visible to the authenticated user
    async fn list_repositories(&self) -> Result<Vec<RepoInfo>, Error> {
        debug!("Fetching repositories for user: {}", self.username);

        let mut repositories = Vec::new();
        let mut page = 1u8;

        loop {
            let page_repos = self
                .client
                .current()
                .list_repos_for_authenticated_user()
                .per_page(100)
                .page(page)
                .send()
                .await
                .map_err(|e| classify(e, &format!("list repositories page {}", page)))?;

            let items = page_repos.items;
            if items.is_empty() {
                break;
            }

            for repo in items {
                let owner = match (&repo.owner, &repo.full_name) {
                    (Some(owner), _) => owner.login.clone(),
                    (None, Some(full_name)) => full_name
                        .split('/')
                        .next()
                        .unwrap_or_default()
                        .to_string(),
                    (None, None) => self.username.clone(),
                };

                repositories.push(RepoInfo {
                    repo: RepoRef::new(owner, repo.name),
                    is_fork: repo.fork.unwrap_or(false),
                });
            }

            // GitHub API pagination limit for u8
            if page >= 255 {
                warn!("Reached maximum pagination limit (255 pages)");
                break;
            }
            page += 1;
        }

        info!("Found {} repositories", repositories.len());
        Ok(repositories)
    }

    async fn set_issues_enabled(&self, repo: &RepoRef, enabled: bool) -> Result<(), Error> {
        let _: serde_json::Value = self
            .client
            .patch(
                format!("/repos/{}/{}", repo.owner, repo.name),
                Some(&serde_json::json!({ "has_issues": enabled })),
            )
            .await
            .map_err(|e| classify(e, &format!("{} update issue tracker", repo)))?;

        Ok(())
    }

    async fn star(&self, repo: &RepoRef) -> Result<(), Error> {
        // Responds 204 with no body, so the typed helper is unusable here
        let response = self
            .client
            ._put(
                format!("/user/starred/{}/{}", repo.owner, repo.name),
                None::<&()>,
            )
            .await
            .map_err(|e| Error::Network(format!("{} star: {}", repo, e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(status_error(status, &format!("{} star", repo)));
        }

        Ok(())
    }

    async fn watch(&self, repo: &RepoRef) -> Result<(), Error> {
        let _: serde_json::Value = self
            .client
            .put(
                format!("/repos/{}/{}/subscription", repo.owner, repo.name),
                Some(&serde_json::json!({ "subscribed": true })),
            )
            .await
            .map_err(|e| classify(e, &format!("{} watch", repo)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_token_argument_wins() {
        let token = resolve_token(Some("ghp_argument")).unwrap();
        assert_eq!(token, "ghp_argument");
    }

    #[test]
    fn test_token_argument_may_be_a_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let token_file = dir.path().join("token.txt");
        std::fs::write(&token_file, "ghp_from_file\n").unwrap();

        let token = resolve_token(Some(token_file.to_str().unwrap())).unwrap();
        assert_eq!(token, "ghp_from_file");
    }

    #[test]
    #[serial]
    fn test_token_from_environment() {
        env::set_var(TOKEN_ENV_VAR, "ghp_environment");
        let token = resolve_token(None).unwrap();
        env::remove_var(TOKEN_ENV_VAR);

        assert_eq!(token, "ghp_environment");
    }

    #[test]
    #[serial]
    fn test_missing_token_is_an_authentication_error() {
        env::remove_var(TOKEN_ENV_VAR);
        let err = resolve_token(None).unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
        assert!(err.to_string().contains(TOKEN_ENV_VAR));
    }
}
