//! GitHub client against a mock GraphQL endpoint.

use portfolio_clients::{GithubClient, GithubConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GithubClient {
    GithubClient::new(GithubConfig {
        api_url: format!("{}/graphql", server.uri()),
        token: "pat".into(),
        owner: "zuhairmhtb".into(),
        timeout_seconds: 5,
    })
    .expect("client")
}

#[tokio::test]
async fn test_issue_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("Authorization", "token pat"))
        .and(body_partial_json(json!({
            "variables": {"owner": "zuhairmhtb", "name": "ThePortfolioAdmin"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {
                "all": {"totalCount": 7},
                "closed": {"totalCount": 5},
                "open": {"totalCount": 2}
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let repo = client
        .repositories()
        .into_iter()
        .find(|r| r.name == "ThePortfolioAdmin")
        .unwrap();
    let count = client.issue_count(&repo).await.unwrap().unwrap();
    assert_eq!(count.repository, "ThePortfolioAdmin");
    assert_eq!(count.title, "The Django Admin");
    assert_eq!((count.all, count.open, count.closed), (7, 2, 5));
}

#[tokio::test]
async fn test_missing_repository_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": null},
            "errors": [{"type": "NOT_FOUND"}]
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let repo = client.repositories().remove(0);
    assert!(client.issue_count(&repo).await.unwrap().is_none());
    assert!(client.issue_counts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthorized_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .mount(&server)
        .await;

    let client = client(&server);
    let repo = client.repositories().remove(0);
    assert!(client.issue_count(&repo).await.unwrap().is_none());
}
