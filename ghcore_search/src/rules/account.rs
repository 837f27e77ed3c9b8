//! Accounts and repositories.

use ghcore_core::is_truthy;
use ghcore_entities::NodeType;
use serde_json::{Value, json};

use super::Resolution;
use crate::context::Context;
use crate::patterns::{Patterns, capture};

pub fn is_github_link(p: &Patterns, text: &str) -> bool {
    p.github_host.is_match(text)
}

pub fn is_mention(_: &Patterns, text: &str) -> bool {
    text.contains('@')
}

pub async fn profile(ctx: &Context<'_>) -> Resolution {
    let actor_login = capture(&ctx.patterns.profile_login, ctx.text);
    let actor_id = ctx.actor_id_for(actor_login).await;
    Resolution::new(NodeType::Actor)
        .with("actor_login", actor_login)
        .with("actor_id", actor_id.clone())
        .with_props(json!({"actor_id": actor_id, "actor_login": actor_login}))
}

/// `@login` handles and e-mail addresses.
pub async fn mention(ctx: &Context<'_>) -> Resolution {
    let text = ctx.text;
    let after_at = text.rsplit('@').next().unwrap_or(text);

    let (actor_login, actor_id) = if text.starts_with('@') {
        let actor_id = ctx.actor_id_for(Some(after_at)).await;
        (Some(after_at.to_string()), actor_id)
    } else {
        ctx.lookups
            .user_by_email(text)
            .await
            .map_or((None, None), |user| (Some(user.login), Some(Value::from(user.id))))
    };

    actor_id.filter(is_truthy).map_or_else(
        || {
            Resolution::obj()
                .with("actor_login", Value::Null)
                .with("actor_id", Value::Null)
                .with_props(json!({"at_str": after_at}))
        },
        |actor_id| {
            Resolution::new(NodeType::Actor)
                .with("actor_login", actor_login.clone())
                .with("actor_id", actor_id.clone())
                .with_props(json!({"actor_id": actor_id, "actor_login": actor_login}))
        },
    )
}

fn trim_repo_suffix(repo_name: &str) -> &str {
    repo_name
        .strip_suffix(".git")
        .or_else(|| repo_name.strip_suffix('.'))
        .unwrap_or(repo_name)
}

pub async fn repo_link(ctx: &Context<'_>) -> Resolution {
    let repo_name = capture(&ctx.patterns.repo_link, ctx.text).map(trim_repo_suffix);
    let repo_id = ctx.repo_id_for(repo_name).await;
    let found = repo_id.as_ref().is_some_and(is_truthy);
    let resolution = if found {
        Resolution::new(NodeType::Repo)
            .with_props(json!({"repo_id": repo_id, "repo_name": repo_name}))
    } else {
        Resolution::obj()
    };
    resolution.with_repo(repo_name, repo_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_suffixes_are_trimmed() {
        assert_eq!(trim_repo_suffix("TW-Genesis/rocksdb-bench.git"), "TW-Genesis/rocksdb-bench");
        assert_eq!(trim_repo_suffix("tikv/rocksdb."), "tikv/rocksdb");
        assert_eq!(trim_repo_suffix("X-lab2017/open-research"), "X-lab2017/open-research");
    }
}
