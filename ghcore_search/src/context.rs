//! Per-call resolution context.
//!
//! Wraps the text, the event-log record it came from and the collaborators.
//! Identity lookups reuse the record whenever it already names the same
//! repository or account.

use ghcore_core::{Condition, IssueKind, Lookups, Record, get_i64, get_str, get_truthy};
use ghcore_entities::NodeType;
use serde_json::Value;

use crate::engine::SearchConfig;
use crate::patterns::Patterns;

pub struct Context<'a> {
    pub text: &'a str,
    pub record: &'a Record,
    pub lookups: &'a Lookups,
    pub patterns: &'a Patterns,
    pub config: &'a SearchConfig,
}

/// Repository known from the event-log record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoRef {
    pub id: Option<Value>,
    pub name: Option<String>,
}

impl RepoRef {
    #[must_use]
    pub fn id_i64(&self) -> Option<i64> {
        self.id.as_ref().and_then(as_i64)
    }
}

#[must_use]
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Bind an issue number for the event log, which stores it as an integer.
fn number_value(number: &str) -> Value {
    number
        .parse::<i64>()
        .map_or_else(|_| Value::from(number), Value::from)
}

impl Context<'_> {
    /// Id for a repository named in the text.
    pub async fn repo_id_for(&self, repo_name: Option<&str>) -> Option<Value> {
        let repo_name = repo_name?;
        if Some(repo_name) == get_str(self.record, "repo_name") {
            return get_truthy(self.record, "repo_id").cloned();
        }
        self.lookups
            .repo_id_by_full_name(repo_name)
            .await
            .map(Value::from)
    }

    /// Id for an account named in the text.
    pub async fn actor_id_for(&self, login: Option<&str>) -> Option<Value> {
        let login = login?;
        if Some(login) == get_str(self.record, "actor_login") {
            return get_truthy(self.record, "actor_id").cloned();
        }
        self.lookups.actor_id_by_login(login).await.map(Value::from)
    }

    /// The record's own repository, completing whichever of id and name is
    /// missing.
    pub async fn record_repo(&self) -> RepoRef {
        if let Some(id) = get_truthy(self.record, "repo_id") {
            let name = match get_str(self.record, "repo_name") {
                Some(name) => Some(name.to_string()),
                None => match get_i64(self.record, "repo_id") {
                    Some(repo_id) => self.lookups.repo_name_by_id(repo_id).await,
                    None => None,
                },
            };
            return RepoRef {
                id: Some(id.clone()),
                name,
            };
        }
        if let Some(name) = get_str(self.record, "repo_name") {
            return RepoRef {
                id: self.lookups.repo_id_by_full_name(name).await.map(Value::from),
                name: Some(name.to_string()),
            };
        }
        RepoRef::default()
    }

    /// Decide whether `#n` in a repository is an issue or a pull request.
    ///
    /// The opening event in the log decides first, then the issue API.
    pub async fn issue_type(&self, repo_id: Option<&Value>, number: Option<&str>) -> NodeType {
        let (Some(repo_id), Some(number)) = (repo_id.and_then(as_i64), number) else {
            return NodeType::Obj;
        };
        let conditions = [
            Condition::eq("repo_id", repo_id),
            Condition::eq("issue_number", number_value(number)),
            Condition::eq("action", "opened"),
        ];
        if let Some(event_type) = self.lookups.field("type", &conditions).await {
            return match event_type.as_str() {
                Some("IssuesEvent") => NodeType::Issue,
                Some("PullRequestEvent") => NodeType::PullRequest,
                _ => NodeType::Obj,
            };
        }
        match self.lookups.issue_kind(repo_id, number).await {
            Some(IssueKind::Issue) => NodeType::Issue,
            Some(IssueKind::PullRequest) => NodeType::PullRequest,
            None => NodeType::Obj,
        }
    }

    /// Confirm a full or abbreviated SHA in a repository, returning the full SHA.
    ///
    /// The event log is asked first; the commit API only when enabled.
    pub async fn confirm_commit(
        &self,
        repo_id: Option<i64>,
        sha: &str,
        prefix: bool,
    ) -> Option<String> {
        let repo_id = repo_id?;
        if prefix {
            let conditions = [
                Condition::eq("repo_id", repo_id),
                Condition::prefix("push_head", sha),
            ];
            let head = self.lookups.field("push_head", &conditions).await;
            if let Some(Value::String(head)) = head {
                return Some(head);
            }
        } else {
            let conditions = [
                Condition::eq("repo_id", repo_id),
                Condition::eq("push_head", sha),
            ];
            if self.lookups.exists(&conditions).await {
                return Some(sha.to_string());
            }
        }
        if !self.config.api_commit_fallback {
            return None;
        }
        self.lookups.commit_sha(repo_id, sha).await
    }
}
