use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use gazette_core::model::{Identity, RepoSlug};

use super::query::{ApiQuery, IssueSearch};
use super::types::{Account, Branch, Comment, Commit, Issue, Repository, SearchResults};
use crate::error::ApiError;

const MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const AGENT: &str = concat!("git-goat-gazette/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Read-only transport for `ApiQuery` descriptors.
///
/// No retries happen at this layer; callers decide what a failure means.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Run `query` and return the decoded success payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for 404, `ApiError::Status` for other
    /// non-success statuses, and `ApiError::Transport` for network faults.
    async fn fetch(&self, query: &ApiQuery) -> Result<Value, ApiError>;
}

/// Unauthenticated HTTP client for the hosting API.
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    base_url: String,
}

impl GithubClient {
    /// Build a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl RemoteApi for GithubClient {
    async fn fetch(&self, query: &ApiQuery) -> Result<Value, ApiError> {
        let path = query.path();
        let url = format!("{}/{path}", self.base_url);
        debug!(%query, "remote query");

        let response = self
            .client
            .get(url)
            .query(&query.params())
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(%query, "remote resource not found");
            return Err(ApiError::NotFound(path));
        }
        if !status.is_success() {
            return Err(ApiError::Status { status, path });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| ApiError::Malformed(err.to_string()))
    }
}

/// Typed view over a `RemoteApi`.
#[derive(Clone)]
pub struct GithubApi {
    remote: Arc<dyn RemoteApi>,
}

impl GithubApi {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteApi>) -> Self {
        Self { remote }
    }

    async fn get<T: DeserializeOwned>(&self, query: &ApiQuery) -> Result<T, ApiError> {
        let value = self.remote.fetch(query).await?;
        serde_json::from_value(value).map_err(|err| ApiError::Malformed(err.to_string()))
    }

    /// Fetch `query`, treating 404 as an absent resource.
    async fn get_optional<T: DeserializeOwned>(
        &self,
        query: &ApiQuery,
    ) -> Result<Option<T>, ApiError> {
        match self.get(query).await {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Public account for `login`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no such account exists.
    pub async fn account(&self, login: &Identity) -> Result<Account, ApiError> {
        self.get(&ApiQuery::user(login)).await
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the issue is missing or the query fails.
    pub async fn issue(&self, repo: &RepoSlug, number: u64) -> Result<Issue, ApiError> {
        self.get(&ApiQuery::issue(repo, number)).await
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the issue is missing or the query fails.
    pub async fn issue_comments(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Vec<Comment>, ApiError> {
        self.get(&ApiQuery::issue_comments(repo, number)).await
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the search fails.
    pub async fn search_issues(
        &self,
        search: &IssueSearch,
    ) -> Result<SearchResults<Issue>, ApiError> {
        self.get(&ApiQuery::search(search)).await
    }

    /// Whether `path` exists in `repo`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for failures other than 404.
    pub async fn file_exists(&self, repo: &RepoSlug, path: &str) -> Result<bool, ApiError> {
        match self.remote.fetch(&ApiQuery::contents(repo, path)).await {
            Ok(_) => Ok(true),
            Err(ApiError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// `None` when the repository does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for failures other than 404.
    pub async fn repository(&self, repo: &RepoSlug) -> Result<Option<Repository>, ApiError> {
        self.get_optional(&ApiQuery::repository(repo)).await
    }

    /// `None` when the repository does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for failures other than 404.
    pub async fn commits(&self, repo: &RepoSlug) -> Result<Option<Vec<Commit>>, ApiError> {
        self.get_optional(&ApiQuery::commits(repo)).await
    }

    /// `None` when the repository does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for failures other than 404.
    pub async fn branches(&self, repo: &RepoSlug) -> Result<Option<Vec<Branch>>, ApiError> {
        self.get_optional(&ApiQuery::branches(repo)).await
    }

    /// Hit the rate-limit endpoint; used as a connectivity probe.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the endpoint cannot be reached or answers with
    /// a failure status.
    pub async fn rate_limit(&self) -> Result<(), ApiError> {
        self.remote.fetch(&ApiQuery::rate_limit()).await.map(|_| ())
    }
}
