//! GitHub REST API integration for timespent.
//!
//! Fetches the raw activity a report is built from:
//! - Commits, attributed to the git author
//! - Commit comments, attributed to the commenting user

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use ts_core::{Category, RawActivity};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const CLIENT_USER_AGENT: &str = concat!("timespent/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: usize = 100;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_WEB_URL: &str = "https://github.com/";

/// GitHub client errors.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The repository could not be reduced to `owner/name`.
    #[error("invalid repository {repo:?}: expected owner/name")]
    InvalidRepo { repo: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Reduces a repository URL or path to `owner/name`.
///
/// Accepts `owner/name`, `{web_url}owner/name`, and either with a trailing
/// `.git` or `/`.
pub fn normalize_repo(repo: &str, web_url: &str) -> Result<String, GithubError> {
    let trimmed = repo.trim();
    let path = trimmed
        .strip_prefix(web_url)
        .unwrap_or(trimmed)
        .trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    match path.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(format!("{owner}/{name}")),
        _ => Err(GithubError::InvalidRepo {
            repo: repo.to_string(),
        }),
    }
}

/// GitHub REST client.
///
/// Cloning shares the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for `api_url`. Blank tokens are treated as absent.
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self, GithubError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(GithubError::ClientBuild)?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Fetches every commit on the default branch of `repo` (`owner/name`).
    pub async fn fetch_commits(&self, repo: &str) -> Result<Vec<CommitPayload>, GithubError> {
        self.fetch_all(&format!("repos/{repo}/commits")).await
    }

    /// Fetches every commit comment of `repo` (`owner/name`).
    pub async fn fetch_comments(&self, repo: &str) -> Result<Vec<CommentPayload>, GithubError> {
        self.fetch_all(&format!("repos/{repo}/comments")).await
    }

    /// Commits followed by comments when `include_comments` is set.
    pub async fn fetch_activity(
        &self,
        repo: &str,
        include_comments: bool,
    ) -> Result<Vec<Activity>, GithubError> {
        let mut activity: Vec<Activity> = self
            .fetch_commits(repo)
            .await?
            .into_iter()
            .map(Activity::Commit)
            .collect();

        if include_comments {
            let comments = self.fetch_comments(repo).await?;
            activity.extend(comments.into_iter().map(Activity::Comment));
        }

        tracing::debug!(repo, items = activity.len(), "fetched activity");
        Ok(activity)
    }

    async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, GithubError> {
        let mut items = Vec::new();
        for page in 1.. {
            let batch: Vec<T> = self.fetch_page(path, page).await?;
            let last = batch.len() < PER_PAGE;
            tracing::debug!(path, page, count = batch.len(), "fetched page");
            items.extend(batch);
            if last {
                break;
            }
        }
        Ok(items)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: usize,
    ) -> Result<Vec<T>, GithubError> {
        let url = format!("{}/{path}", self.api_url);
        let mut request = self
            .http
            .get(&url)
            .query(&[("per_page", PER_PAGE), ("page", page)])
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|err| GithubError::InvalidResponse(err.to_string()))
    }
}

fn parse_api_error(status: u16, body: &str) -> GithubError {
    #[derive(Deserialize)]
    struct ErrorPayload {
        message: String,
    }

    let message = serde_json::from_str::<ErrorPayload>(body)
        .map_or_else(|_| body.trim().to_string(), |payload| payload.message);
    GithubError::Api { status, message }
}

/// One item of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitPayload {
    #[serde(default)]
    pub sha: String,
    pub commit: CommitDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetails {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<GitPerson>,
}

/// Git author as recorded in the commit object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitPerson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: String,
}

impl RawActivity for CommitPayload {
    fn author_name(&self) -> &str {
        self.commit.author.as_ref().map_or("", |a| a.name.as_str())
    }

    fn author_email(&self) -> &str {
        self.commit.author.as_ref().map_or("", |a| a.email.as_str())
    }

    fn date_time(&self) -> &str {
        self.commit.author.as_ref().map_or("", |a| a.date.as_str())
    }

    fn category(&self) -> Category {
        Category::Commit
    }
}

/// One item of `GET /repos/{owner}/{repo}/comments`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub commit_id: String,
    #[serde(default)]
    pub user: Option<GithubUser>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub login: String,
}

impl RawActivity for CommentPayload {
    fn author_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.login.as_str())
    }

    fn author_email(&self) -> &str {
        ""
    }

    fn date_time(&self) -> &str {
        &self.created_at
    }

    fn category(&self) -> Category {
        Category::Comment
    }
}

/// A fetched commit or comment.
#[derive(Debug, Clone)]
pub enum Activity {
    Commit(CommitPayload),
    Comment(CommentPayload),
}

impl RawActivity for Activity {
    fn author_name(&self) -> &str {
        match self {
            Self::Commit(commit) => commit.author_name(),
            Self::Comment(comment) => comment.author_name(),
        }
    }

    fn author_email(&self) -> &str {
        match self {
            Self::Commit(commit) => commit.author_email(),
            Self::Comment(comment) => comment.author_email(),
        }
    }

    fn date_time(&self) -> &str {
        match self {
            Self::Commit(commit) => commit.date_time(),
            Self::Comment(comment) => comment.date_time(),
        }
    }

    fn category(&self) -> Category {
        match self {
            Self::Commit(commit) => commit.category(),
            Self::Comment(comment) => comment.category(),
        }
    }
}
