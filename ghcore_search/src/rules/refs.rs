//! Branches, tags, commit comments, wiki pages and releases.

use std::borrow::Cow;

use ghcore_core::{Condition, RefKind, get_str, get_truthy};
use ghcore_entities::NodeType;
use serde_json::{Value, json};

use super::Resolution;
use crate::context::{Context, as_i64};
use crate::patterns::{Patterns, capture};

pub fn is_tree(p: &Patterns, text: &str) -> bool {
    p.tree.is_match(text)
}

pub fn is_commit_comment(p: &Patterns, text: &str) -> bool {
    p.commit_comment.is_match(text)
}

pub fn is_wiki(p: &Patterns, text: &str) -> bool {
    p.wiki.is_match(text)
}

pub fn is_release_tag(p: &Patterns, text: &str) -> bool {
    p.release_tag.is_match(text)
}

fn decode(reference: &str) -> Cow<'_, str> {
    urlencoding::decode(reference).unwrap_or(Cow::Borrowed(reference))
}

/// The listed name a path reference denotes, comparing literally and after
/// percent-decoding.
fn find_ref<'n>(names: &'n [String], reference: &str) -> Option<&'n str> {
    let decoded = decode(reference);
    names
        .iter()
        .find(|name| name.as_str() == reference || name.as_str() == decoded)
        .map(String::as_str)
}

async fn ref_names(ctx: &Context<'_>, repo_name: Option<&str>, kind: RefKind) -> Vec<String> {
    match repo_name {
        Some(repo_name) => ctx.lookups.ref_names(repo_name, kind).await,
        None => Vec::new(),
    }
}

pub async fn tree(ctx: &Context<'_>) -> Resolution {
    let p = ctx.patterns;
    let repo_name = capture(&p.tree_repo, ctx.text);
    let repo_id = ctx.repo_id_for(repo_name).await;

    let Some(reference) = capture(&p.tree_ref, ctx.text) else {
        return Resolution::obj().with_repo(repo_name, repo_id);
    };

    let branches = ref_names(ctx, repo_name, RefKind::Branch).await;
    if let Some(branch_name) = find_ref(&branches, reference) {
        return Resolution::new(NodeType::Branch)
            .with_repo(repo_name, repo_id)
            .with("branch_name", branch_name)
            .with_props(json!({"branch_name": branch_name}));
    }

    let tags = ref_names(ctx, repo_name, RefKind::Tag).await;
    let tag_name = find_ref(&tags, reference).map(str::to_string).or_else(|| {
        (!reference.contains('/')).then(|| decode(reference).into_owned())
    });
    let Some(tag_name) = tag_name else {
        return Resolution::obj()
            .with_repo(repo_name, repo_id)
            .with_props(json!({"label": "GitHub_Dir"}));
    };
    Resolution::new(NodeType::Tag)
        .with_repo(repo_name, repo_id)
        .with("tag_name", tag_name.as_str())
        .with_props(json!({"tag_name": tag_name}))
}

pub async fn commit_comment(ctx: &Context<'_>) -> Resolution {
    let p = ctx.patterns;
    let repo_name = capture(&p.any_repo, ctx.text);
    let repo_id = ctx.repo_id_for(repo_name).await;
    let commit_comment_id = capture(&p.commit_comment_id, ctx.text);
    let commit_comment_sha = capture(&p.commit_comment_sha, ctx.text);
    Resolution::new(NodeType::CommitComment)
        .with_repo(repo_name, repo_id)
        .with("commit_comment_id", commit_comment_id)
        .with("commit_comment_sha", commit_comment_sha)
        .with_props(json!({"commit_comment_id": commit_comment_id}))
}

pub async fn wiki(ctx: &Context<'_>) -> Resolution {
    let repo_name = capture(&ctx.patterns.wiki_repo, ctx.text);
    let repo_id = ctx.repo_id_for(repo_name).await;
    Resolution::new(NodeType::Gollum).with_repo(repo_name, repo_id)
}

pub async fn release_tag(ctx: &Context<'_>) -> Resolution {
    let p = ctx.patterns;
    let repo_name = capture(&p.any_repo, ctx.text);
    let repo_id = ctx.repo_id_for(repo_name).await;
    let tag_name = capture(&p.release_tag, ctx.text).map(|t| decode(t).into_owned());

    let known_tag =
        tag_name.is_some() && tag_name.as_deref() == get_str(ctx.record, "release_tag_name");
    let release_id = if known_tag {
        get_truthy(ctx.record, "release_id").cloned()
    } else {
        match (repo_id.as_ref().and_then(as_i64), &tag_name) {
            (Some(id), Some(tag)) => {
                let conditions = [
                    Condition::eq("repo_id", id),
                    Condition::eq("release_tag_name", tag.as_str()),
                ];
                ctx.lookups.field("release_id", &conditions).await
            }
            _ => None,
        }
    };

    let resolution = Resolution::new(NodeType::Release).with_repo(repo_name, repo_id);
    let Some(release_id) = release_id else {
        return resolution
            .with("release_id", Value::Null)
            .with("release_tag_name", Value::Null)
            .with_props(json!({"release_tag_name": tag_name, "status": "QuickSearchFailed"}));
    };
    resolution
        .with("release_id", release_id.clone())
        .with("release_tag_name", tag_name.clone())
        .with_props(json!({"release_id": release_id, "release_tag_name": tag_name}))
}
