//! Entity type schemas.
//!
//! Each entity type declares its fields in derivation order. A field may carry
//! a [`Derivation`] that computes it from sibling fields when it is missing.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exid::ExidTemplate;

/// Value domain of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Integer,
    String,
    List,
}

impl Domain {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::List => "list",
        }
    }

    /// Whether a non-null value belongs to this domain.
    ///
    /// Integer fields also accept decimal strings, the form ids take when
    /// they are cut out of reference text.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Integer, Value::String(s)) => {
                !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
            }
            (Self::String, Value::String(_)) | (Self::List, Value::Array(_)) => true,
            _ => false,
        }
    }

    /// Convert a decomposed text part into this domain when it parses.
    #[must_use]
    pub fn coerce(self, text: &str) -> Value {
        match self {
            Self::Integer => text
                .parse::<i64>()
                .map_or_else(|_| Value::String(text.to_string()), Value::from),
            Self::String | Self::List => Value::String(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    PrimaryKey,
    Identifying,
    Value,
}

/// Binds a template parameter to an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExidArg {
    pub param: &'static str,
    pub field: &'static str,
    /// Strip a leading `refs/heads/` before composing.
    pub trim_refs_heads: bool,
}

impl ExidArg {
    const fn same(name: &'static str) -> Self {
        Self {
            param: name,
            field: name,
            trim_refs_heads: false,
        }
    }

    const fn bind(param: &'static str, field: &'static str) -> Self {
        Self {
            param,
            field,
            trim_refs_heads: false,
        }
    }

    const fn trimmed(param: &'static str, field: &'static str) -> Self {
        Self {
            param,
            field,
            trim_refs_heads: true,
        }
    }
}

/// External point lookups a derivation may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Account id for the login held in the named field.
    ActorIdByLogin(&'static str),
    /// Repository id for the full name held in the named field.
    RepoIdByFullName(&'static str),
    /// A column of the first event-log row matching `type = event_type` and
    /// every `(column, field)` key.
    StoreField {
        column: &'static str,
        event_type: Option<&'static str>,
        keys: &'static [(&'static str, &'static str)],
    },
    /// The pusher of a commit: the record's actor for push events, otherwise
    /// looked up from the push that carried the commit.
    CommitAuthorId,
    /// The owner account of `repo_name`, reusing the record's actor when the
    /// logins agree.
    RepoOwnerId,
    /// Parent SHAs of `commit_sha` in `repo_id`.
    CommitParents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Compose {
        template: ExidTemplate,
        args: &'static [ExidArg],
    },
    Decompose {
        template: ExidTemplate,
        source: &'static str,
        part: &'static str,
    },
    CopyOf(&'static str),
    /// The name segment of an `owner/name` field.
    RepoShortName(&'static str),
    Lookup(Lookup),
}

impl Derivation {
    /// Field names this derivation reads.
    #[must_use]
    pub fn params(&self) -> Vec<&'static str> {
        match self {
            Self::Compose { args, .. } => args.iter().map(|a| a.field).collect(),
            Self::Decompose { source, .. } => vec![*source],
            Self::CopyOf(field)
            | Self::RepoShortName(field)
            | Self::Lookup(Lookup::ActorIdByLogin(field) | Lookup::RepoIdByFullName(field)) => {
                vec![*field]
            }
            Self::Lookup(Lookup::StoreField { keys, .. }) => {
                keys.iter().map(|(_, field)| *field).collect()
            }
            Self::Lookup(Lookup::CommitAuthorId) => vec!["commit_sha", "type", "actor_id"],
            Self::Lookup(Lookup::RepoOwnerId) => vec!["repo_name", "actor_id", "actor_login"],
            Self::Lookup(Lookup::CommitParents) => vec!["commit_sha", "repo_id"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub role: FieldRole,
    pub domain: Domain,
    pub derivation: Option<Derivation>,
}

impl FieldDef {
    const fn pk(name: &'static str, domain: Domain) -> Self {
        Self {
            name,
            role: FieldRole::PrimaryKey,
            domain,
            derivation: None,
        }
    }

    const fn key(name: &'static str, domain: Domain) -> Self {
        Self {
            name,
            role: FieldRole::Identifying,
            domain,
            derivation: None,
        }
    }

    const fn value(name: &'static str, domain: Domain) -> Self {
        Self {
            name,
            role: FieldRole::Value,
            domain,
            derivation: None,
        }
    }

    const fn derived(mut self, derivation: Derivation) -> Self {
        self.derivation = Some(derivation);
        self
    }

    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        matches!(self.role, FieldRole::PrimaryKey)
    }
}

/// Declared fields of one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySchema {
    fields: Vec<FieldDef>,
}

impl EntitySchema {
    const fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Fields in derivation order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<&'static str> {
        self.fields.iter().find(|f| f.is_primary_key()).map(|f| f.name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Entity types produced by reference resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Actor,
    Branch,
    Commit,
    CommitComment,
    Gollum,
    Issue,
    IssueComment,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    Push,
    Release,
    Repo,
    Tag,
    Obj,
}

impl NodeType {
    pub const ALL: [Self; 15] = [
        Self::Actor,
        Self::Branch,
        Self::Commit,
        Self::CommitComment,
        Self::Gollum,
        Self::Issue,
        Self::IssueComment,
        Self::PullRequest,
        Self::PullRequestReview,
        Self::PullRequestReviewComment,
        Self::Push,
        Self::Release,
        Self::Repo,
        Self::Tag,
        Self::Obj,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Actor => "Actor",
            Self::Branch => "Branch",
            Self::Commit => "Commit",
            Self::CommitComment => "CommitComment",
            Self::Gollum => "Gollum",
            Self::Issue => "Issue",
            Self::IssueComment => "IssueComment",
            Self::PullRequest => "PullRequest",
            Self::PullRequestReview => "PullRequestReview",
            Self::PullRequestReviewComment => "PullRequestReviewComment",
            Self::Push => "Push",
            Self::Release => "Release",
            Self::Repo => "Repo",
            Self::Tag => "Tag",
            Self::Obj => "Obj",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown entity type: {s}"))
    }
}

use Domain::{Integer, List, String as Text};
use Lookup::StoreField;

const fn compose(template: ExidTemplate, args: &'static [ExidArg]) -> Derivation {
    Derivation::Compose { template, args }
}

const fn decompose(template: ExidTemplate, source: &'static str, part: &'static str) -> Derivation {
    Derivation::Decompose {
        template,
        source,
        part,
    }
}

const fn store(
    column: &'static str,
    event_type: Option<&'static str>,
    keys: &'static [(&'static str, &'static str)],
) -> Derivation {
    Derivation::Lookup(StoreField {
        column,
        event_type,
        keys,
    })
}

const REPO_BRANCH: &[ExidArg] = &[ExidArg::same("repo_id"), ExidArg::same("branch_name")];
const REPO_ISSUE: &[ExidArg] = &[ExidArg::same("repo_id"), ExidArg::same("issue_number")];
const REPO_ONLY: &[ExidArg] = &[ExidArg::same("repo_id")];
const REPO_TAG: &[ExidArg] = &[ExidArg::same("repo_id"), ExidArg::same("tag_name")];
const PULL_BASE: &[ExidArg] = &[
    ExidArg::same("repo_id"),
    ExidArg::bind("branch_name", "pull_base_ref"),
];
const PULL_HEAD: &[ExidArg] = &[
    ExidArg::bind("repo_id", "pull_head_repo_id"),
    ExidArg::bind("branch_name", "pull_head_ref"),
];
const PUSH_BRANCH: &[ExidArg] = &[
    ExidArg::same("repo_id"),
    ExidArg::trimmed("branch_name", "push_ref"),
];
const RELEASE_TAG: &[ExidArg] = &[
    ExidArg::same("repo_id"),
    ExidArg::bind("tag_name", "release_tag_name"),
];
const TAG_BRANCH: &[ExidArg] = &[
    ExidArg::same("repo_id"),
    ExidArg::bind("branch_name", "tag_branch_name"),
];
const PUSHED_COMMIT: &[(&str, &str)] = &[("push_head", "commit_sha")];
const REPO_NUMBER: &[(&str, &str)] = &[("repo_id", "repo_id"), ("issue_number", "issue_number")];

fn actor() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("actor_id", Integer)
            .derived(Derivation::Lookup(Lookup::ActorIdByLogin("actor_login"))),
        FieldDef::key("actor_login", Text)
            .derived(store("actor_login", None, &[("actor_id", "actor_id")])),
    ])
}

fn branch() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("_branch_exid", Text).derived(compose(ExidTemplate::Branch, REPO_BRANCH)),
        FieldDef::key("repo_id", Integer)
            .derived(decompose(ExidTemplate::Branch, "_branch_exid", "repo_id")),
        FieldDef::key("branch_name", Text)
            .derived(decompose(ExidTemplate::Branch, "_branch_exid", "branch_name")),
    ])
}

fn commit() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("commit_sha", Text),
        FieldDef::key("_commit_author_id", Integer)
            .derived(Derivation::Lookup(Lookup::CommitAuthorId)),
        FieldDef::key("repo_id", Integer)
            .derived(store("repo_id", Some("PushEvent"), PUSHED_COMMIT)),
        FieldDef::key("__commit_parents_sha", List)
            .derived(Derivation::Lookup(Lookup::CommitParents)),
        FieldDef::value("push_commits.message", Text)
            .derived(store("push_commits.message", Some("PushEvent"), PUSHED_COMMIT)),
        FieldDef::value("push_commits.name", Text)
            .derived(store("push_commits.name", Some("PushEvent"), PUSHED_COMMIT)),
        FieldDef::value("push_commits.email", Text)
            .derived(store("push_commits.email", Some("PushEvent"), PUSHED_COMMIT)),
    ])
}

fn commit_comment() -> EntitySchema {
    const BY_ID: &[(&str, &str)] = &[("commit_comment_id", "commit_comment_id")];
    EntitySchema::new(vec![
        FieldDef::pk("commit_comment_id", Integer),
        FieldDef::key("commit_comment_author_id", Integer),
        FieldDef::key("commit_comment_sha", Text),
        FieldDef::value("body", Text).derived(store("body", Some("CommitCommentEvent"), BY_ID)),
        FieldDef::value("commit_comment_path", Text)
            .derived(store("commit_comment_path", Some("CommitCommentEvent"), BY_ID)),
    ])
}

fn gollum() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("_gollum_exid", Text)
            .derived(compose(ExidTemplate::Gollum, REPO_ONLY)),
        FieldDef::key("repo_id", Integer)
            .derived(decompose(ExidTemplate::Gollum, "_gollum_exid", "repo_id")),
    ])
}

fn issue() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("_issue_exid", Text).derived(compose(ExidTemplate::Issue, REPO_ISSUE)),
        FieldDef::key("issue_id", Integer),
        FieldDef::key("repo_id", Integer)
            .derived(decompose(ExidTemplate::Issue, "_issue_exid", "repo_id")),
        FieldDef::key("issue_number", Integer)
            .derived(decompose(ExidTemplate::Issue, "_issue_exid", "issue_number")),
        FieldDef::key("issue_author_id", Integer),
        FieldDef::value("issue_title", Text)
            .derived(store("issue_title", Some("IssuesEvent"), REPO_NUMBER)),
        FieldDef::value("body", Text).derived(store("body", Some("IssuesEvent"), REPO_NUMBER)),
    ])
}

fn issue_comment() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("issue_comment_id", Integer),
        FieldDef::key("_issue_exid", Text).derived(compose(ExidTemplate::Issue, REPO_ISSUE)),
        FieldDef::key("repo_id", Integer),
        FieldDef::key("issue_number", Integer),
        FieldDef::key("issue_comment_author_id", Integer),
        FieldDef::value("body", Text).derived(store(
            "body",
            Some("IssueCommentEvent"),
            &[("issue_comment_id", "issue_comment_id")],
        )),
    ])
}

fn pull_request() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("_issue_exid", Text).derived(compose(ExidTemplate::Issue, REPO_ISSUE)),
        FieldDef::key("issue_id", Integer),
        FieldDef::key("repo_id", Integer)
            .derived(decompose(ExidTemplate::Issue, "_issue_exid", "repo_id")),
        FieldDef::key("issue_number", Integer)
            .derived(decompose(ExidTemplate::Issue, "_issue_exid", "issue_number")),
        FieldDef::key("issue_author_id", Integer),
        FieldDef::key("pull_merge_commit_sha", Text),
        FieldDef::key("pull_merged_by_id", Integer),
        FieldDef::key("_pull_base_branch_exid", Text).derived(compose(ExidTemplate::Branch, PULL_BASE)),
        FieldDef::key("pull_base_ref", Text),
        FieldDef::key("_pull_head_branch_exid", Text).derived(compose(ExidTemplate::Branch, PULL_HEAD)),
        FieldDef::key("pull_head_repo_id", Integer),
        FieldDef::key("pull_head_ref", Text),
        FieldDef::value("issue_title", Text)
            .derived(store("issue_title", Some("PullRequestEvent"), REPO_NUMBER)),
        FieldDef::value("body", Text)
            .derived(store("body", Some("PullRequestEvent"), REPO_NUMBER)),
    ])
}

fn pull_request_review() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("pull_review_id", Integer),
        FieldDef::key("_issue_exid", Text).derived(compose(ExidTemplate::Issue, REPO_ISSUE)),
        FieldDef::key("repo_id", Integer),
        FieldDef::key("issue_id", Integer),
        FieldDef::key("issue_number", Integer),
        FieldDef::key("pull_requested_reviewer_id", Integer),
        FieldDef::key("_pull_head_branch_exid", Text).derived(compose(ExidTemplate::Branch, PULL_HEAD)),
        FieldDef::key("pull_head_repo_id", Integer),
        FieldDef::key("pull_head_ref", Text),
        FieldDef::value("body", Text).derived(store(
            "body",
            Some("PullRequestReviewEvent"),
            &[("pull_review_id", "pull_review_id")],
        )),
    ])
}

fn pull_request_review_comment() -> EntitySchema {
    const BY_ID: &[(&str, &str)] = &[("pull_review_comment_id", "pull_review_comment_id")];
    EntitySchema::new(vec![
        FieldDef::pk("pull_review_comment_id", Integer),
        FieldDef::key("_issue_exid", Text).derived(compose(ExidTemplate::Issue, REPO_ISSUE)),
        FieldDef::key("repo_id", Integer),
        FieldDef::key("issue_id", Integer),
        FieldDef::key("issue_number", Integer),
        FieldDef::key("pull_review_id", Integer),
        FieldDef::key("pull_review_comment_author_id", Integer),
        FieldDef::key("push_head", Text),
        FieldDef::value("body", Text)
            .derived(store("body", Some("PullRequestReviewCommentEvent"), BY_ID)),
        FieldDef::value("pull_review_comment_path", Text).derived(store(
            "pull_review_comment_path",
            Some("PullRequestReviewCommentEvent"),
            BY_ID,
        )),
    ])
}

fn push() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("push_id", Integer),
        FieldDef::key("actor_id", Integer),
        FieldDef::key("_push_branch_exid", Text).derived(compose(ExidTemplate::Branch, PUSH_BRANCH)),
        FieldDef::key("repo_id", Integer),
        FieldDef::key("push_ref", Text),
        FieldDef::key("push_head", Text),
    ])
}

fn release() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("release_id", Integer),
        FieldDef::key("release_author_id", Integer),
        FieldDef::key("_release_tag_exid", Text).derived(compose(ExidTemplate::Tag, RELEASE_TAG)),
        FieldDef::key("repo_id", Integer),
        FieldDef::key("release_tag_name", Text),
        FieldDef::key("release_name", Text),
        FieldDef::value("release_body", Text).derived(store(
            "release_body",
            Some("ReleaseEvent"),
            &[("release_id", "release_id")],
        )),
    ])
}

fn repo() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("repo_id", Integer)
            .derived(Derivation::Lookup(Lookup::RepoIdByFullName("repo_name"))),
        FieldDef::key("repo_name", Text)
            .derived(store("repo_name", None, &[("repo_id", "repo_id")])),
        FieldDef::key("_repo_full_name", Text).derived(Derivation::CopyOf("repo_name")),
        FieldDef::key("_owner_id", Integer).derived(Derivation::Lookup(Lookup::RepoOwnerId)),
        FieldDef::key("_name", Text).derived(Derivation::RepoShortName("repo_name")),
        FieldDef::key("org_id", Integer),
        FieldDef::value("repo_description", Text).derived(store(
            "repo_description",
            Some("PullRequestEvent"),
            &[("repo_id", "repo_id")],
        )),
    ])
}

fn tag() -> EntitySchema {
    EntitySchema::new(vec![
        FieldDef::pk("_tag_exid", Text).derived(compose(ExidTemplate::Tag, REPO_TAG)),
        FieldDef::key("repo_id", Integer)
            .derived(decompose(ExidTemplate::Tag, "_tag_exid", "repo_id")),
        FieldDef::key("tag_name", Text)
            .derived(decompose(ExidTemplate::Tag, "_tag_exid", "tag_name")),
        FieldDef::key("_tag_branch_exid", Text).derived(compose(ExidTemplate::Branch, TAG_BRANCH)),
        FieldDef::key("tag_branch_name", Text),
    ])
}

static EMPTY: EntitySchema = EntitySchema::new(Vec::new());

static BUILTIN: LazyLock<SchemaRegistry> = LazyLock::new(|| {
    let mut registry = SchemaRegistry::default();
    registry.register(NodeType::Actor, actor());
    registry.register(NodeType::Branch, branch());
    registry.register(NodeType::Commit, commit());
    registry.register(NodeType::CommitComment, commit_comment());
    registry.register(NodeType::Gollum, gollum());
    registry.register(NodeType::Issue, issue());
    registry.register(NodeType::IssueComment, issue_comment());
    registry.register(NodeType::PullRequest, pull_request());
    registry.register(NodeType::PullRequestReview, pull_request_review());
    registry.register(NodeType::PullRequestReviewComment, pull_request_review_comment());
    registry.register(NodeType::Push, push());
    registry.register(NodeType::Release, release());
    registry.register(NodeType::Repo, repo());
    registry.register(NodeType::Tag, tag());
    registry
});

/// Registry of entity schemas keyed by type name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, EntitySchema>,
}

impl SchemaRegistry {
    /// The built-in GitHub entity schemas.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    pub fn register(&mut self, node_type: NodeType, schema: EntitySchema) {
        self.schemas.insert(node_type.as_str(), schema);
    }

    /// Schema for a type name; unknown names get the empty schema.
    #[must_use]
    pub fn get(&self, entity_type: &str) -> &EntitySchema {
        self.schemas.get(entity_type).unwrap_or(&EMPTY)
    }

    #[must_use]
    pub fn contains(&self, entity_type: &str) -> bool {
        self.schemas.contains_key(entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_builtin_type_has_one_primary_key() {
        let registry = SchemaRegistry::builtin();
        for node_type in NodeType::ALL {
            let schema = registry.get(node_type.as_str());
            let pks = schema.fields().iter().filter(|f| f.is_primary_key()).count();
            let expected = usize::from(node_type != NodeType::Obj);
            assert_eq!(pks, expected, "{node_type}");
        }
    }

    #[test]
    fn unknown_types_get_the_empty_schema() {
        let schema = SchemaRegistry::builtin().get("Discussion");
        assert!(schema.is_empty());
        assert_eq!(schema.primary_key(), None);
    }

    #[test]
    fn derivation_params_name_sibling_fields() {
        let registry = SchemaRegistry::builtin();
        let pr = registry.get("PullRequest");
        let head = pr.field("_pull_head_branch_exid").and_then(|f| f.derivation);
        assert_eq!(
            head.map(|d| d.params()),
            Some(vec!["pull_head_repo_id", "pull_head_ref"])
        );

        let repo = registry.get("Repo");
        assert_eq!(repo.primary_key(), Some("repo_id"));
        for field in repo.fields() {
            for param in field.derivation.map(|d| d.params()).unwrap_or_default() {
                assert!(
                    repo.field(param).is_some() || ["actor_id", "actor_login"].contains(&param),
                    "{param}"
                );
            }
        }
    }

    #[test]
    fn domains_accept_matching_values() {
        assert!(Domain::Integer.accepts(&json!(288_431_943)));
        assert!(Domain::Integer.accepts(&json!(u64::MAX)));
        assert!(Domain::Integer.accepts(&json!("10502")));
        assert!(!Domain::Integer.accepts(&json!("10502a")));
        assert!(!Domain::Integer.accepts(&json!("")));
        assert!(!Domain::String.accepts(&json!(10502)));
        assert!(Domain::List.accepts(&json!(["abc"])));
        assert_eq!(Domain::Integer.coerce("42"), json!(42));
        assert_eq!(Domain::Integer.coerce("x42"), json!("x42"));
    }

    #[test]
    fn node_types_round_trip_through_names() {
        for node_type in NodeType::ALL {
            assert_eq!(node_type.as_str().parse::<NodeType>(), Ok(node_type));
        }
        assert!("Discussion".parse::<NodeType>().is_err());
    }
}
