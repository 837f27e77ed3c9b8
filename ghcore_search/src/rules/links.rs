//! Links that never name an entity of their own.

use ghcore_core::{get_str, get_truthy};
use serde_json::{Value, json};
use url::Url;

use super::Resolution;
use crate::context::Context;
use crate::patterns::capture;

/// Obj carrying the repository the link points into.
pub async fn repo_context(ctx: &Context<'_>) -> Resolution {
    let repo_name = capture(&ctx.patterns.any_repo, ctx.text);
    let repo_id = ctx.repo_id_for(repo_name).await;
    Resolution::obj().with_repo(repo_name, repo_id)
}

async fn org_id_for(ctx: &Context<'_>, org_login: &str) -> Option<Value> {
    if Some(org_login) == get_str(ctx.record, "org_login") {
        return get_truthy(ctx.record, "org_id").cloned();
    }
    ctx.actor_id_for(Some(org_login)).await
}

/// Organization pages (`orgs/<login>/...`) and other in-repository pages.
pub async fn other_links(ctx: &Context<'_>) -> Resolution {
    let Some(path) = capture(&ctx.patterns.any_repo, ctx.text) else {
        return Resolution::obj();
    };

    if let Some(org_login) = path.strip_prefix("orgs/") {
        let org_id = org_id_for(ctx, org_login).await;
        return Resolution::obj().with_props(json!({"org_login": org_login, "org_id": org_id}));
    }

    let repo_id = ctx.repo_id_for(Some(path)).await;
    Resolution::obj()
        .with_repo(Some(path), repo_id.clone())
        .with_props(json!({"repo_name": path, "repo_id": repo_id}))
}

/// GitHub-hosted services such as gists and apps.
pub fn other_service(ctx: &Context<'_>) -> Resolution {
    let Ok(url) = Url::parse(ctx.text) else {
        return Resolution::obj();
    };
    let Some(host) = url.host_str() else {
        return Resolution::obj();
    };

    let mut props = json!({"service": host});
    let mut segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some("apps"), Some(app)) if host.ends_with("github.com") => props["app"] = json!(app),
        (Some(first), _) if ctx.patterns.login.is_match(first) => {
            props["owner_login"] = json!(first);
        }
        _ => {}
    }
    Resolution::obj().with_props(props)
}

pub fn external_link(ctx: &Context<'_>) -> Resolution {
    Url::parse(ctx.text)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .map_or_else(Resolution::obj, |domain| {
            Resolution::obj().with_props(json!({"domain": domain}))
        })
}
