//! Ordered rule lists per category.
//!
//! The first rule whose predicate accepts the text decides; later rules are
//! never consulted.

mod account;
mod issue_pr;
mod links;
mod refs;
mod sha;

use ghcore_core::Record;
use ghcore_entities::NodeType;
use serde_json::Value;

use crate::category::LinkCategory;
use crate::context::Context;
use crate::patterns::Patterns;

/// What an extractor found: the entity type, raw fields for the entity and
/// auxiliary properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub node_type: NodeType,
    pub fields: Record,
    pub props: Option<Record>,
}

impl Resolution {
    #[must_use]
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            fields: Record::new(),
            props: None,
        }
    }

    #[must_use]
    pub fn obj() -> Self {
        Self::new(NodeType::Obj)
    }

    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Record the repository fields, absent values included.
    #[must_use]
    pub fn with_repo(self, repo_name: Option<&str>, repo_id: Option<Value>) -> Self {
        self.with("repo_name", repo_name).with("repo_id", repo_id)
    }

    /// Set properties from a JSON object literal.
    #[must_use]
    pub fn with_props(mut self, props: Value) -> Self {
        self.props = match props {
            Value::Object(map) => Some(map),
            _ => None,
        };
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    ReviewComment,
    Review,
    IssueComment,
    PullRequest,
    Issue,
    Shorthand,
    CommitPath,
    FullSha,
    AbbrevSha,
    Profile,
    Mention,
    RepoLink,
    Tree,
    CommitComment,
    Wiki,
    ReleaseTag,
    RepoContext,
    OtherLinks,
    OtherService,
    ExternalLink,
}

impl Extractor {
    pub async fn run(self, ctx: &Context<'_>) -> Resolution {
        match self {
            Self::ReviewComment => issue_pr::review_comment(ctx).await,
            Self::Review => issue_pr::review(ctx).await,
            Self::IssueComment => issue_pr::issue_comment(ctx).await,
            Self::PullRequest => issue_pr::issue_or_pull(ctx, NodeType::PullRequest).await,
            Self::Issue => issue_pr::issue_or_pull(ctx, NodeType::Issue).await,
            Self::Shorthand => issue_pr::shorthand(ctx).await,
            Self::CommitPath => sha::commit_path(ctx).await,
            Self::FullSha => sha::full_sha(ctx).await,
            Self::AbbrevSha => sha::abbrev_sha(ctx).await,
            Self::Profile => account::profile(ctx).await,
            Self::Mention => account::mention(ctx).await,
            Self::RepoLink => account::repo_link(ctx).await,
            Self::Tree => refs::tree(ctx).await,
            Self::CommitComment => refs::commit_comment(ctx).await,
            Self::Wiki => refs::wiki(ctx).await,
            Self::ReleaseTag => refs::release_tag(ctx).await,
            Self::RepoContext => links::repo_context(ctx).await,
            Self::OtherLinks => links::other_links(ctx).await,
            Self::OtherService => links::other_service(ctx),
            Self::ExternalLink => links::external_link(ctx),
        }
    }
}

/// A named predicate and the extractor it guards.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub predicate: fn(&Patterns, &str) -> bool,
    pub extractor: Extractor,
}

impl Rule {
    #[must_use]
    pub fn matches(&self, patterns: &Patterns, text: &str) -> bool {
        (self.predicate)(patterns, text)
    }
}

const fn rule(
    name: &'static str,
    predicate: fn(&Patterns, &str) -> bool,
    extractor: Extractor,
) -> Rule {
    Rule {
        name,
        predicate,
        extractor,
    }
}

const fn always(_: &Patterns, _: &str) -> bool {
    true
}

const ISSUE_PR: &[Rule] = &[
    rule("review_comment", issue_pr::is_review_comment, Extractor::ReviewComment),
    rule("review", issue_pr::is_review, Extractor::Review),
    rule("issue_comment", issue_pr::is_issue_comment, Extractor::IssueComment),
    rule("pull_request", issue_pr::is_pull_request, Extractor::PullRequest),
    rule("issue", issue_pr::is_issue, Extractor::Issue),
    rule("shorthand", issue_pr::is_shorthand, Extractor::Shorthand),
];

const SHA: &[Rule] = &[
    rule("commit_path", sha::is_commit_path, Extractor::CommitPath),
    rule("full_sha", sha::is_full_sha, Extractor::FullSha),
    rule("abbrev_sha", sha::is_abbrev_sha, Extractor::AbbrevSha),
];

const ACTOR: &[Rule] = &[
    rule("profile", account::is_github_link, Extractor::Profile),
    rule("mention", account::is_mention, Extractor::Mention),
];

const REPO: &[Rule] = &[rule("link", account::is_github_link, Extractor::RepoLink)];

const BRANCH_TAG_DIR: &[Rule] = &[rule("tree", refs::is_tree, Extractor::Tree)];

const COMMIT_COMMENT: &[Rule] = &[rule(
    "commit_comment",
    refs::is_commit_comment,
    Extractor::CommitComment,
)];

const GOLLUM: &[Rule] = &[rule("wiki", refs::is_wiki, Extractor::Wiki)];

const RELEASE: &[Rule] = &[rule("release_tag", refs::is_release_tag, Extractor::ReleaseTag)];

const FILES: &[Rule] = &[rule("repo_context", always, Extractor::RepoContext)];

const OTHER_LINKS: &[Rule] = &[rule("other_links", always, Extractor::OtherLinks)];

const OTHER_SERVICE: &[Rule] = &[rule("other_service", always, Extractor::OtherService)];

const EXTERNAL: &[Rule] = &[rule("external_link", always, Extractor::ExternalLink)];

/// Rules for a category, in priority order.
#[must_use]
pub const fn rules_for(category: LinkCategory) -> &'static [Rule] {
    match category {
        LinkCategory::IssuePr => ISSUE_PR,
        LinkCategory::Sha => SHA,
        LinkCategory::Actor => ACTOR,
        LinkCategory::Repo => REPO,
        LinkCategory::BranchTagDir => BRANCH_TAG_DIR,
        LinkCategory::CommitComment => COMMIT_COMMENT,
        LinkCategory::Gollum => GOLLUM,
        LinkCategory::Release => RELEASE,
        LinkCategory::FilesFileChanges => FILES,
        LinkCategory::OtherLinks => OTHER_LINKS,
        LinkCategory::OtherService => OTHER_SERVICE,
        LinkCategory::ExternalLinks => EXTERNAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[expect(clippy::expect_used, reason = "Built-in grammar compiles")]
    fn first_rule(category: LinkCategory, text: &str) -> Option<&'static str> {
        let patterns = Patterns::new().expect("grammar compiles");
        rules_for(category)
            .iter()
            .find(|r| r.matches(&patterns, text))
            .map(|r| r.name)
    }

    #[test]
    fn issue_pr_rules_are_ordered() {
        let cases = [
            ("https://github.com/redis/redis/pull/10502#discussion_r839879682", "review_comment"),
            (
                "https://github.com/openframeworks/openFrameworks/pull/7383/files/1f9efefc25685f062c03ebfbd2832c6e47481d01#r1411384813",
                "review_comment",
            ),
            ("https://github.com/X-lab2017/open-galaxy/pull/2#pullrequestreview-818986332", "review"),
            ("https://github.com/X-lab2017/open-galaxy/pull/2#issuecomment-982562221", "issue_comment"),
            ("https://github.com/xxx/xx/pull/3221", "pull_request"),
            ("https://github.com/X-lab2017/open-digger/pull/1038#issue-1443186854", "pull_request"),
            ("http://www.github.com/xxx/xx/issues/3221", "issue"),
            ("https://github.com/facebook/rocksdb/blob/main/HISTORY.md#840", "shorthand"),
            ("redis/redis-doc#1711", "shorthand"),
        ];
        for (text, expected) in cases {
            assert_eq!(first_rule(LinkCategory::IssuePr, text), Some(expected), "{text}");
        }
        assert_eq!(first_rule(LinkCategory::IssuePr, "see the docs"), None);
    }

    #[test]
    fn sha_rules_are_ordered() {
        let sha = "5c9a6c06871cb9fe42814af9c039eb6da5427a6e";
        let link = format!("https://www.github.com/xxx/xx/commit/{sha}");
        assert_eq!(first_rule(LinkCategory::Sha, &link), Some("commit_path"));
        assert_eq!(first_rule(LinkCategory::Sha, sha), Some("full_sha"));
        assert_eq!(first_rule(LinkCategory::Sha, "5c9a6c1"), Some("abbrev_sha"));
    }

    #[test]
    fn catch_all_categories_always_match() {
        for category in [
            LinkCategory::FilesFileChanges,
            LinkCategory::OtherLinks,
            LinkCategory::OtherService,
            LinkCategory::ExternalLinks,
        ] {
            assert!(first_rule(category, "anything").is_some());
        }
    }
}
