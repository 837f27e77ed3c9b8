//! Issues, pull requests and their comments, reviews and shorthands.

use ghcore_entities::NodeType;
use serde_json::{Value, json};

use super::Resolution;
use crate::context::Context;
use crate::patterns::{Patterns, capture, capture_all};

const TEXT_LOCATOR: &str = "Text_Locator";

pub fn is_review_comment(p: &Patterns, text: &str) -> bool {
    p.discussion_anchor.is_match(text) || p.files_review_anchor.is_match(text)
}

pub fn is_review(p: &Patterns, text: &str) -> bool {
    p.review_anchor.is_match(text)
}

pub fn is_issue_comment(p: &Patterns, text: &str) -> bool {
    p.issue_comment_anchor.is_match(text)
}

pub fn is_pull_request(p: &Patterns, text: &str) -> bool {
    p.pull_path.is_match(text) || p.pull_anchor_path.is_match(text)
}

pub fn is_issue(p: &Patterns, text: &str) -> bool {
    p.issue_path.is_match(text) || p.issue_anchor_path.is_match(text)
}

pub fn is_shorthand(p: &Patterns, text: &str) -> bool {
    p.hash_number.is_match(text)
}

/// Repository and number shared by every issue-like link.
async fn issue_link(ctx: &Context<'_>, node_type: NodeType) -> (Resolution, Option<String>) {
    let p = ctx.patterns;
    let repo_name = capture(&p.issue_repo, ctx.text);
    let repo_id = ctx.repo_id_for(repo_name).await;
    let issue_number = capture(&p.issue_number, ctx.text).map(str::to_string);
    let resolution = Resolution::new(node_type)
        .with_repo(repo_name, repo_id)
        .with("issue_number", issue_number.clone());
    (resolution, issue_number)
}

/// An issue-like link with one trailing numeric id.
async fn anchored(
    ctx: &Context<'_>,
    node_type: NodeType,
    id_field: &str,
    id: Option<&str>,
) -> Resolution {
    let (resolution, issue_number) = issue_link(ctx, node_type).await;
    resolution
        .with(id_field, id)
        .with_props(json!({"issue_number": issue_number, id_field: id}))
}

pub async fn review_comment(ctx: &Context<'_>) -> Resolution {
    let id = capture(&ctx.patterns.review_comment_id, ctx.text);
    anchored(ctx, NodeType::PullRequestReviewComment, "pull_review_comment_id", id).await
}

pub async fn review(ctx: &Context<'_>) -> Resolution {
    let id = capture(&ctx.patterns.review_id, ctx.text);
    anchored(ctx, NodeType::PullRequestReview, "pull_review_id", id).await
}

pub async fn issue_comment(ctx: &Context<'_>) -> Resolution {
    let id = capture(&ctx.patterns.issue_comment_id, ctx.text);
    anchored(ctx, NodeType::IssueComment, "issue_comment_id", id).await
}

/// Split an anchor such as `event-6444202459` at its last dash.
fn anchor_element(anchor: &str) -> Option<(&str, &str)> {
    let (element, id) = anchor.rsplit_once('-')?;
    (!element.is_empty()).then_some((element, id))
}

pub async fn issue_or_pull(ctx: &Context<'_>, node_type: NodeType) -> Resolution {
    let (resolution, issue_number) = issue_link(ctx, node_type).await;
    let mut props = json!({"issue_number": issue_number});
    if let Some((element, id)) =
        capture(&ctx.patterns.anchor, ctx.text).and_then(anchor_element)
    {
        props[element] = Value::from(id);
    }
    resolution.with_props(props)
}

pub async fn shorthand(ctx: &Context<'_>) -> Resolution {
    let p = ctx.patterns;
    let text = ctx.text;
    let number = || capture(&p.shorthand_number, text).map(str::to_string);

    let (node_type, repo_name, repo_id, issue_number) =
        if p.pr_shorthand.is_match(text) || p.issue_shorthand.is_match(text) {
            let node_type = if p.pr_shorthand.is_match(text) {
                NodeType::PullRequest
            } else {
                NodeType::Issue
            };
            let repo = ctx.record_repo().await;
            (node_type, repo.name, repo.id, number())
        } else if p.bare_shorthand.is_match(text) {
            let issue_number = number();
            let repo = ctx.record_repo().await;
            let node_type = ctx
                .issue_type(repo.id.as_ref(), issue_number.as_deref())
                .await;
            (node_type, repo.name, repo.id, issue_number)
        } else if let Some(repo_name) = capture(&p.repo_shorthand, text) {
            let issue_number = number();
            let repo_id = ctx.repo_id_for(Some(repo_name)).await;
            let node_type = ctx
                .issue_type(repo_id.as_ref(), issue_number.as_deref())
                .await;
            (node_type, Some(repo_name.to_string()), repo_id, issue_number)
        } else {
            (NodeType::Obj, None, None, None)
        };

    let numbers = || capture_all(&p.numbers, text);
    let props = if node_type == NodeType::Obj {
        let mut props = json!({"numbers": numbers()});
        if text.starts_with("http") {
            props["label"] = json!(TEXT_LOCATOR);
            props["duplicate_matching"] = json!(true);
        }
        props
    } else if let Some(issue_number) = &issue_number {
        json!({"issue_number": issue_number})
    } else {
        json!({"numbers": numbers()})
    };

    Resolution::new(node_type)
        .with_repo(repo_name.as_deref(), repo_id)
        .with("issue_number", issue_number)
        .with_props(props)
}
