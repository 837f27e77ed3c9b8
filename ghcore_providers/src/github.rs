use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ghcore_core::{CommitGraph, GitHubApi, IdentityResolver, IssueKind, RefKind, UserInfo};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::retry::retry_with_backoff;
use crate::token_pool::TokenPool;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

const REF_PAGE_SIZE: u32 = 100;
const MAX_REF_PAGES: usize = 50;

const REFS_QUERY: &str = r"
query($owner: String!, $name: String!, $prefix: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    refs(refPrefix: $prefix, first: $first, after: $after) {
      nodes { name }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

/// GitHub REST and GraphQL client.
///
/// Non-success statuses are logged and read as "not found"; only transport
/// failures and rate limiting are retried.
pub struct GitHubClient {
    client: Client,
    tokens: Arc<TokenPool>,
    api_url: String,
    graphql_url: String,
    retry_delays: Vec<Duration>,
}

impl GitHubClient {
    pub fn new(
        tokens: Arc<TokenPool>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        info!("Creating GitHubClient with {} token(s)", tokens.len());
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            tokens,
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            retry_delays: [2, 4, 8].into_iter().map(Duration::from_secs).collect(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, api_url: &str, graphql_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self.graphql_url = graphql_url.to_string();
        self
    }

    #[must_use]
    pub fn with_retry_delays(mut self, retry_delays: Vec<Duration>) -> Self {
        self.retry_delays = retry_delays;
        self
    }

    /// GET a REST path relative to the API root.
    pub async fn get_json(&self, path: &str) -> Result<Option<Value>, ProviderError> {
        let url = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        retry_with_backoff(
            || self.send_once(Method::GET, &url, None),
            &self.retry_delays,
            ProviderError::is_transient,
        )
        .await
    }

    /// Run a GraphQL query and return its `data` object.
    pub async fn post_graphql(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let body = json!({"query": query, "variables": variables});
        let response = retry_with_backoff(
            || self.send_once(Method::POST, &self.graphql_url, Some(&body)),
            &self.retry_delays,
            ProviderError::is_transient,
        )
        .await?;
        let Some(mut response) = response else {
            return Ok(None);
        };
        if let Some(errors) = response.get("errors").filter(|e| !e.is_null()) {
            return Err(ProviderError::GraphQl(errors.to_string()));
        }
        Ok(response
            .get_mut("data")
            .map(Value::take)
            .filter(|data| !data.is_null()))
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, ProviderError> {
        let lease = self.tokens.acquire();
        if !lease.wait.is_zero() {
            warn!(
                "All GitHub tokens exhausted, waiting {}s for reset",
                lease.wait.as_secs()
            );
            sleep(lease.wait).await;
        }

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &lease.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if let Some(token) = &lease.token {
            self.tokens.record(token, response.headers());
        }

        let status = response.status();
        if is_rate_limited(status, response.headers()) {
            return Err(ProviderError::RateLimited(url.to_string()));
        }
        if !status.is_success() {
            warn!("{method} {url} returned {status}");
            return Ok(None);
        }
        Ok(Some(response.json::<Value>().await?))
    }

    async fn ref_page(
        &self,
        owner: &str,
        name: &str,
        kind: RefKind,
        after: Option<&str>,
    ) -> Result<Option<Value>, ProviderError> {
        let variables = json!({
            "owner": owner,
            "name": name,
            "prefix": kind.prefix(),
            "first": REF_PAGE_SIZE,
            "after": after,
        });
        let data = self.post_graphql(REFS_QUERY, variables).await?;
        Ok(data
            .and_then(|mut data| data.pointer_mut("/repository/refs").map(Value::take))
            .filter(|refs| !refs.is_null()))
    }
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    headers.contains_key("retry-after")
        || headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0")
}

fn id_of(value: &Value) -> Option<i64> {
    value.get("id").and_then(Value::as_i64)
}

fn str_of(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl IdentityResolver for GitHubClient {
    async fn repo_id_by_full_name(&self, full_name: &str) -> anyhow::Result<Option<i64>> {
        let repo = self.get_json(&format!("repos/{full_name}")).await?;
        Ok(repo.as_ref().and_then(id_of))
    }

    async fn repo_name_by_id(&self, repo_id: i64) -> anyhow::Result<Option<String>> {
        let repo = self.get_json(&format!("repositories/{repo_id}")).await?;
        Ok(repo.and_then(|r| str_of(&r, "full_name")))
    }

    async fn actor_id_by_login(&self, login: &str) -> anyhow::Result<Option<i64>> {
        let user = self.get_json(&format!("users/{login}")).await?;
        Ok(user.as_ref().and_then(id_of))
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>> {
        let query = urlencoding::encode(&format!("{email} in:email")).into_owned();
        let found = self.get_json(&format!("search/users?q={query}")).await?;
        let user = found
            .as_ref()
            .and_then(|f| f.get("items"))
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| {
                Some(UserInfo {
                    login: str_of(item, "login")?,
                    id: id_of(item)?,
                })
            });
        Ok(user)
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn issue_kind(
        &self,
        repo_id: i64,
        issue_number: &str,
    ) -> anyhow::Result<Option<IssueKind>> {
        let issue = self
            .get_json(&format!("repositories/{repo_id}/issues/{issue_number}"))
            .await?;
        Ok(issue.map(|issue| {
            if issue.get("pull_request").is_some_and(|pr| !pr.is_null()) {
                IssueKind::PullRequest
            } else {
                IssueKind::Issue
            }
        }))
    }

    async fn commit_sha(&self, repo_id: i64, sha: &str) -> anyhow::Result<Option<String>> {
        let commit = self
            .get_json(&format!("repositories/{repo_id}/commits/{sha}"))
            .await?;
        Ok(commit.and_then(|c| str_of(&c, "sha")))
    }

    async fn ref_names(&self, repo_full_name: &str, kind: RefKind) -> anyhow::Result<Vec<String>> {
        let Some((owner, name)) = repo_full_name.split_once('/') else {
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        let mut after: Option<String> = None;
        for _ in 0..MAX_REF_PAGES {
            let Some(refs) = self.ref_page(owner, name, kind, after.as_deref()).await? else {
                break;
            };
            names.extend(
                refs["nodes"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|node| str_of(node, "name")),
            );
            let page = &refs["pageInfo"];
            after = page["endCursor"].as_str().map(str::to_string);
            if !page["hasNextPage"].as_bool().unwrap_or(false) || after.is_none() {
                break;
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl CommitGraph for GitHubClient {
    async fn commit_parent_shas(&self, sha: &str, repo_id: i64) -> anyhow::Result<Vec<String>> {
        let commit = self
            .get_json(&format!("repositories/{repo_id}/commits/{sha}"))
            .await?;
        let parents = commit
            .as_ref()
            .and_then(|c| c.get("parents"))
            .and_then(Value::as_array)
            .map(|parents| parents.iter().filter_map(|p| str_of(p, "sha")).collect())
            .unwrap_or_default();
        Ok(parents)
    }

    async fn tag_commit_sha(&self, repo_id: i64, tag_name: &str) -> anyhow::Result<Option<String>> {
        let tag = urlencoding::encode(tag_name);
        let commit = self
            .get_json(&format!("repositories/{repo_id}/commits/{tag}"))
            .await?;
        Ok(commit.and_then(|c| str_of(&c, "sha")))
    }
}
