//! Collaborator contracts used to complete identifying fields.
//!
//! Implementations may hit a database or the GitHub API. They report failures
//! through `anyhow::Result`; [`Lookups`] is the single place where those
//! failures become absent values so resolution never raises on a bad lookup.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// A filter on an event-log column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`
    Eq(String, Value),
    /// `column LIKE 'prefix%'`
    Prefix(String, String),
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn prefix(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Prefix(column.into(), prefix.into())
    }

    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq(column, _) | Self::Prefix(column, _) => column,
        }
    }
}

/// A GitHub account found by e-mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub login: String,
    pub id: i64,
}

/// Whether an issue number belongs to an issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    Issue,
    PullRequest,
}

/// Git reference namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Branch,
    Tag,
}

impl RefKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Branch => "refs/heads/",
            Self::Tag => "refs/tags/",
        }
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn repo_id_by_full_name(&self, full_name: &str) -> anyhow::Result<Option<i64>>;

    async fn repo_name_by_id(&self, repo_id: i64) -> anyhow::Result<Option<String>>;

    async fn actor_id_by_login(&self, login: &str) -> anyhow::Result<Option<i64>>;

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>>;
}

/// Point lookups against the event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// First value of `column` among rows matching every condition.
    async fn field(&self, column: &str, conditions: &[Condition]) -> anyhow::Result<Option<Value>>;

    /// Whether any row matches every condition.
    async fn exists(&self, conditions: &[Condition]) -> anyhow::Result<bool> {
        let Some(first) = conditions.first() else {
            return Ok(false);
        };
        Ok(self.field(first.column(), conditions).await?.is_some())
    }
}

#[async_trait]
pub trait CommitGraph: Send + Sync {
    async fn commit_parent_shas(&self, sha: &str, repo_id: i64) -> anyhow::Result<Vec<String>>;

    async fn tag_commit_sha(&self, repo_id: i64, tag_name: &str) -> anyhow::Result<Option<String>>;
}

#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn issue_kind(&self, repo_id: i64, issue_number: &str)
    -> anyhow::Result<Option<IssueKind>>;

    /// Full SHA of a commit in the repository, given a full or abbreviated SHA.
    async fn commit_sha(&self, repo_id: i64, sha: &str) -> anyhow::Result<Option<String>>;

    async fn ref_names(&self, repo_full_name: &str, kind: RefKind) -> anyhow::Result<Vec<String>>;
}

/// Collaborator that knows nothing.
///
/// Used when a backend is not configured and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl IdentityResolver for Offline {
    async fn repo_id_by_full_name(&self, _full_name: &str) -> anyhow::Result<Option<i64>> {
        Ok(None)
    }

    async fn repo_name_by_id(&self, _repo_id: i64) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn actor_id_by_login(&self, _login: &str) -> anyhow::Result<Option<i64>> {
        Ok(None)
    }

    async fn user_by_email(&self, _email: &str) -> anyhow::Result<Option<UserInfo>> {
        Ok(None)
    }
}

#[async_trait]
impl EventStore for Offline {
    async fn field(
        &self,
        _column: &str,
        _conditions: &[Condition],
    ) -> anyhow::Result<Option<Value>> {
        Ok(None)
    }
}

#[async_trait]
impl CommitGraph for Offline {
    async fn commit_parent_shas(&self, _sha: &str, _repo_id: i64) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn tag_commit_sha(
        &self,
        _repo_id: i64,
        _tag_name: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

#[async_trait]
impl GitHubApi for Offline {
    async fn issue_kind(
        &self,
        _repo_id: i64,
        _issue_number: &str,
    ) -> anyhow::Result<Option<IssueKind>> {
        Ok(None)
    }

    async fn commit_sha(&self, _repo_id: i64, _sha: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn ref_names(&self, _repo_full_name: &str, _kind: RefKind) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Identity resolution that asks `primary` first and `fallback` when the
/// primary has no answer or fails.
///
/// Typically the event-log store backed by the GitHub API.
pub struct ChainedIdentity {
    primary: Arc<dyn IdentityResolver>,
    fallback: Arc<dyn IdentityResolver>,
}

impl ChainedIdentity {
    pub fn new(primary: Arc<dyn IdentityResolver>, fallback: Arc<dyn IdentityResolver>) -> Self {
        Self { primary, fallback }
    }
}

fn primary_answer<T>(result: anyhow::Result<Option<T>>, what: &str) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(e) => {
            debug!("Primary {what} lookup failed, trying fallback: {e:#}");
            None
        }
    }
}

#[async_trait]
impl IdentityResolver for ChainedIdentity {
    async fn repo_id_by_full_name(&self, full_name: &str) -> anyhow::Result<Option<i64>> {
        let primary = self.primary.repo_id_by_full_name(full_name).await;
        if let Some(id) = primary_answer(primary, "repo_id_by_full_name") {
            return Ok(Some(id));
        }
        self.fallback.repo_id_by_full_name(full_name).await
    }

    async fn repo_name_by_id(&self, repo_id: i64) -> anyhow::Result<Option<String>> {
        let primary = self.primary.repo_name_by_id(repo_id).await;
        if let Some(name) = primary_answer(primary, "repo_name_by_id") {
            return Ok(Some(name));
        }
        self.fallback.repo_name_by_id(repo_id).await
    }

    async fn actor_id_by_login(&self, login: &str) -> anyhow::Result<Option<i64>> {
        let primary = self.primary.actor_id_by_login(login).await;
        if let Some(id) = primary_answer(primary, "actor_id_by_login") {
            return Ok(Some(id));
        }
        self.fallback.actor_id_by_login(login).await
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>> {
        let primary = self.primary.user_by_email(email).await;
        if let Some(user) = primary_answer(primary, "user_by_email") {
            return Ok(Some(user));
        }
        self.fallback.user_by_email(email).await
    }
}

fn settle<T>(result: anyhow::Result<Option<T>>, what: &str, key: &dyn Display) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(e) => {
            warn!("{what}({key}) failed: {e:#}");
            None
        }
    }
}

/// The collaborators available to one resolver, with every call reduced to
/// value-or-absent.
#[derive(Clone)]
pub struct Lookups {
    identity: Arc<dyn IdentityResolver>,
    store: Arc<dyn EventStore>,
    commits: Arc<dyn CommitGraph>,
    api: Arc<dyn GitHubApi>,
}

impl Default for Lookups {
    fn default() -> Self {
        Self::offline()
    }
}

impl Lookups {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        store: Arc<dyn EventStore>,
        commits: Arc<dyn CommitGraph>,
        api: Arc<dyn GitHubApi>,
    ) -> Self {
        Self {
            identity,
            store,
            commits,
            api,
        }
    }

    /// Lookups that never find anything.
    #[must_use]
    pub fn offline() -> Self {
        let offline = Arc::new(Offline);
        Self {
            identity: offline.clone(),
            store: offline.clone(),
            commits: offline.clone(),
            api: offline,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn EventStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_commits(mut self, commits: Arc<dyn CommitGraph>) -> Self {
        self.commits = commits;
        self
    }

    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn GitHubApi>) -> Self {
        self.api = api;
        self
    }

    pub async fn repo_id_by_full_name(&self, full_name: &str) -> Option<i64> {
        let result = self.identity.repo_id_by_full_name(full_name).await;
        settle(result, "repo_id_by_full_name", &full_name)
    }

    pub async fn repo_name_by_id(&self, repo_id: i64) -> Option<String> {
        let result = self.identity.repo_name_by_id(repo_id).await;
        settle(result, "repo_name_by_id", &repo_id)
    }

    pub async fn actor_id_by_login(&self, login: &str) -> Option<i64> {
        let result = self.identity.actor_id_by_login(login).await;
        settle(result, "actor_id_by_login", &login)
    }

    pub async fn user_by_email(&self, email: &str) -> Option<UserInfo> {
        let result = self.identity.user_by_email(email).await;
        settle(result, "user_by_email", &email)
    }

    pub async fn field(&self, column: &str, conditions: &[Condition]) -> Option<Value> {
        let result = self.store.field(column, conditions).await;
        settle(result, "field", &column).filter(|v| !v.is_null())
    }

    pub async fn exists(&self, conditions: &[Condition]) -> bool {
        match self.store.exists(conditions).await {
            Ok(found) => found,
            Err(e) => {
                warn!("exists({conditions:?}) failed: {e:#}");
                false
            }
        }
    }

    pub async fn commit_parent_shas(&self, sha: &str, repo_id: i64) -> Option<Vec<String>> {
        match self.commits.commit_parent_shas(sha, repo_id).await {
            Ok(parents) if parents.is_empty() => None,
            Ok(parents) => Some(parents),
            Err(e) => {
                warn!("commit_parent_shas({sha}) failed: {e:#}");
                None
            }
        }
    }

    pub async fn tag_commit_sha(&self, repo_id: i64, tag_name: &str) -> Option<String> {
        let result = self.commits.tag_commit_sha(repo_id, tag_name).await;
        settle(result, "tag_commit_sha", &tag_name)
    }

    pub async fn issue_kind(&self, repo_id: i64, issue_number: &str) -> Option<IssueKind> {
        let result = self.api.issue_kind(repo_id, issue_number).await;
        settle(result, "issue_kind", &issue_number)
    }

    pub async fn commit_sha(&self, repo_id: i64, sha: &str) -> Option<String> {
        let result = self.api.commit_sha(repo_id, sha).await;
        settle(result, "commit_sha", &sha)
    }

    pub async fn ref_names(&self, repo_full_name: &str, kind: RefKind) -> Vec<String> {
        match self.api.ref_names(repo_full_name, kind).await {
            Ok(names) => names,
            Err(e) => {
                warn!("ref_names({repo_full_name}, {kind:?}) failed: {e:#}");
                Vec::new()
            }
        }
    }
}
