//! Commit references: commit URLs, full SHAs and abbreviated SHAs.

use ghcore_entities::NodeType;
use serde_json::{Value, json};

use super::Resolution;
use crate::context::Context;
use crate::patterns::{Patterns, capture};

const QUICK_SEARCH_FAILED: &str = "QuickSearchFailed";

pub fn is_commit_path(p: &Patterns, text: &str) -> bool {
    p.commit_path.is_match(text)
}

pub fn is_full_sha(p: &Patterns, text: &str) -> bool {
    p.full_sha.is_match(text)
}

pub fn is_abbrev_sha(p: &Patterns, text: &str) -> bool {
    p.abbrev_sha.is_match(text)
}

pub async fn commit_path(ctx: &Context<'_>) -> Resolution {
    let p = ctx.patterns;
    let repo_name = capture(&p.commit_repo, ctx.text);
    let repo_id = ctx.repo_id_for(repo_name).await;
    let commit_sha = capture(&p.commit_path, ctx.text);
    Resolution::new(NodeType::Commit)
        .with_repo(repo_name, repo_id)
        .with("commit_sha", commit_sha)
        .with_props(json!({"commit_sha": commit_sha}))
}

pub async fn full_sha(ctx: &Context<'_>) -> Resolution {
    let repo = ctx.record_repo().await;
    let Some(commit_sha) = ctx.confirm_commit(repo.id_i64(), ctx.text, false).await else {
        return Resolution::obj()
            .with_repo(None, None)
            .with("commit_sha", Value::Null)
            .with_props(json!({
                "sha": ctx.text,
                "status": QUICK_SEARCH_FAILED,
                "label": "SHA",
            }));
    };
    Resolution::new(NodeType::Commit)
        .with_repo(repo.name.as_deref(), repo.id)
        .with("commit_sha", commit_sha.as_str())
        .with_props(json!({"commit_sha": commit_sha}))
}

/// How the text around an abbreviated SHA reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShaHint {
    /// Mentions a commit or SHA explicitly.
    Commit,
    /// Only digits, so most likely a plain number.
    NotAnEntity,
    Undecided,
}

fn sha_hint(text: &str) -> ShaHint {
    let upper = text.to_uppercase();
    if upper.contains("COMMIT") || upper.contains("SHA") {
        ShaHint::Commit
    } else if text.chars().all(|c| c.is_ascii_digit()) {
        ShaHint::NotAnEntity
    } else {
        ShaHint::Undecided
    }
}

pub async fn abbrev_sha(ctx: &Context<'_>) -> Resolution {
    let text = ctx.text;
    let hint = sha_hint(text);
    let Some(sha7) = capture(&ctx.patterns.abbrev_sha, text).filter(|_| hint != ShaHint::NotAnEntity)
    else {
        return Resolution::obj()
            .with_repo(None, None)
            .with("commit_sha", Value::Null)
            .with_props(json!({"label": "NotAnEntity"}));
    };

    let repo = ctx.record_repo().await;
    if let Some(commit_sha) = ctx.confirm_commit(repo.id_i64(), sha7, true).await {
        return Resolution::new(NodeType::Commit)
            .with_repo(repo.name.as_deref(), repo.id)
            .with("commit_sha", commit_sha.as_str())
            .with_props(json!({"sha_abbr_7": text, "commit_sha": commit_sha}));
    }

    let unresolved = |node_type| {
        Resolution::new(node_type)
            .with_repo(None, None)
            .with("commit_sha", Value::Null)
    };
    match hint {
        ShaHint::Commit => {
            let label = if text.to_uppercase().contains("COMMIT") {
                "Commit SHA"
            } else {
                "SHA"
            };
            unresolved(NodeType::Commit).with_props(json!({
                "sha_abbr_7": text,
                "status": QUICK_SEARCH_FAILED,
                "label": label,
            }))
        }
        _ => unresolved(NodeType::Obj).with_props(json!({"sha_abbr_7": text})),
    }
}
