use std::sync::Arc;
use std::time::Duration;

use ghcore_core::{CommitGraph, GitHubApi, IdentityResolver, IssueKind, RefKind};
use ghcore_providers::{GitHubClient, TokenPool};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[expect(clippy::expect_used, reason = "Client builds with defaults")]
fn client(server: &MockServer, tokens: Arc<TokenPool>) -> GitHubClient {
    GitHubClient::new(tokens, "ghcore-test", Duration::from_secs(5))
        .expect("client builds")
        .with_base_url(&server.uri(), &format!("{}/graphql", server.uri()))
        .with_retry_delays(vec![Duration::from_millis(1)])
}

#[tokio::test]
#[expect(clippy::expect_used, reason = "Mock server answers")]
async fn identity_lookups_read_ids_and_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/redis/redis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 156_018})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/156018"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"full_name": "redis/redis"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/users"))
        .and(query_param("q", "someone@example.com in:email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "items": [{"login": "birdflyi", "id": 33_318_484}],
        })))
        .mount(&server)
        .await;

    let github = client(&server, Arc::new(TokenPool::anonymous()));
    assert_eq!(
        github.repo_id_by_full_name("redis/redis").await.expect("lookup"),
        Some(156_018)
    );
    assert_eq!(
        github.repo_name_by_id(156_018).await.expect("lookup").as_deref(),
        Some("redis/redis")
    );
    let user = github
        .user_by_email("someone@example.com")
        .await
        .expect("lookup")
        .expect("user found");
    assert_eq!(user.login, "birdflyi");
    assert_eq!(user.id, 33_318_484);
}

#[tokio::test]
#[expect(clippy::expect_used, reason = "Mock server answers")]
async fn missing_resources_read_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/ghost-user"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .expect(1)
        .mount(&server)
        .await;

    let github = client(&server, Arc::new(TokenPool::anonymous()));
    assert_eq!(github.actor_id_by_login("ghost-user").await.expect("lookup"), None);
}

#[tokio::test]
#[expect(clippy::expect_used, reason = "Mock server answers")]
async fn issue_kind_follows_pull_request_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repositories/156018/issues/10502"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 10502,
            "pull_request": {"url": "https://api.github.com/repos/redis/redis/pulls/10502"},
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/156018/issues/10472"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"number": 10472})))
        .mount(&server)
        .await;

    let github = client(&server, Arc::new(TokenPool::anonymous()));
    assert_eq!(
        github.issue_kind(156_018, "10502").await.expect("lookup"),
        Some(IssueKind::PullRequest)
    );
    assert_eq!(
        github.issue_kind(156_018, "10472").await.expect("lookup"),
        Some(IssueKind::Issue)
    );
}

#[tokio::test]
#[expect(clippy::expect_used, reason = "Mock server answers")]
async fn commit_lookups_expand_prefixes_and_parents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repositories/156018/commits/5c9a6c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "5c9a6c06871cb9fe42814af9c039eb6da5427a6e",
            "parents": [
                {"sha": "1111111111111111111111111111111111111111"},
                {"sha": "2222222222222222222222222222222222222222"},
            ],
        })))
        .mount(&server)
        .await;

    let github = client(&server, Arc::new(TokenPool::anonymous()));
    assert_eq!(
        github.commit_sha(156_018, "5c9a6c1").await.expect("lookup").as_deref(),
        Some("5c9a6c06871cb9fe42814af9c039eb6da5427a6e")
    );
    let parents = github
        .commit_parent_shas("5c9a6c1", 156_018)
        .await
        .expect("lookup");
    assert_eq!(parents.len(), 2);
}

#[tokio::test]
#[expect(clippy::expect_used, reason = "Mock server answers")]
async fn ref_names_follow_graphql_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({"variables": {"after": null}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"refs": {
                "nodes": [{"name": "unstable"}],
                "pageInfo": {"hasNextPage": true, "endCursor": "c1"},
            }}},
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({"variables": {"after": "c1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"refs": {
                "nodes": [{"name": "7.0"}],
                "pageInfo": {"hasNextPage": false, "endCursor": "c2"},
            }}},
        })))
        .mount(&server)
        .await;

    let github = client(&server, Arc::new(TokenPool::anonymous()));
    let names = github
        .ref_names("redis/redis", RefKind::Branch)
        .await
        .expect("lookup");
    assert_eq!(names, vec!["unstable".to_string(), "7.0".to_string()]);
}

#[tokio::test]
#[expect(clippy::expect_used, reason = "Mock server answers")]
async fn graphql_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Could not resolve to a Repository"}],
        })))
        .mount(&server)
        .await;

    let github = client(&server, Arc::new(TokenPool::anonymous()));
    assert!(github.ref_names("no/such", RefKind::Tag).await.is_err());
}

#[tokio::test]
#[expect(clippy::expect_used, reason = "Mock server answers")]
async fn rate_limited_token_is_rotated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/birdflyi"))
        .and(header("authorization", "Bearer ghp_first"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Reset", "4102444800"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/birdflyi"))
        .and(header("authorization", "Bearer ghp_second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 33_318_484})))
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenPool::new(vec![
        "ghp_first".to_string(),
        "ghp_second".to_string(),
    ]));
    let github = client(&server, tokens.clone());
    assert_eq!(
        github.actor_id_by_login("birdflyi").await.expect("lookup"),
        Some(33_318_484)
    );
    assert_eq!(tokens.acquire().token.as_deref(), Some("ghp_second"));
}
