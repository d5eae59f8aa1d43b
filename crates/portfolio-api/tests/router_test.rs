//! Routes exercised through the full router with `oneshot`.
//!
//! Nothing here touches PostgreSQL: the pool is lazy and every request
//! either fails before a query or uses the in-memory repositories.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestApp;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use portfolio_core::defaults::PERMISSION_DENIED_MESSAGE;
use portfolio_core::{Role, SyncPostsPayload, INVALID_DATE_MESSAGE};

// =============================================================================
// REST
// =============================================================================

#[tokio::test]
async fn test_health_and_banner() {
    let app = TestApp::new().await;

    let (status, body) = app.get_json("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());

    let (status, body) = app
        .send(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Rage against the dying of the light.");
}

#[tokio::test]
async fn test_request_id_header_is_set() {
    let app = TestApp::new().await;
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await
    .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = TestApp::new().await;
    let (status, _) = app.get_json("/api/auth/v1/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get_json("/api/auth/v1/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_claims() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::Admin, Role::User]);
    let (status, body) = app.get_json("/api/auth/v1/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"username": "tester", "roles": ["admin", "user"]}));
}

#[tokio::test]
async fn test_refresh_token_not_accepted_as_access() {
    let app = TestApp::new().await;
    let refresh = app.jwt.issue_refresh("tester").unwrap();
    let (status, _) = app.get_json("/api/auth/v1/me", Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_invalid_token() {
    let app = TestApp::new().await;
    let access = app.token(vec![Role::Admin]);
    let (status, body) = app
        .post_json("/api/auth/v1/refresh", None, json!({"refresh_token": access}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"message": "Invalid credentials"}));
}

#[tokio::test]
async fn test_device_token_requires_admin() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::User]);
    let (status, body) = app
        .post_json(
            "/api/auth/v1/device-token",
            Some(&token),
            json!({"device_name": "kiosk"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"detail": PERMISSION_DENIED_MESSAGE}));
}

#[tokio::test]
async fn test_device_token_rejects_non_positive_lifetime() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::Admin]);
    let (status, _) = app
        .post_json(
            "/api/auth/v1/device-token",
            Some(&token),
            json!({"device_name": "kiosk", "expires_in_days": 0}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_device_me_rejects_user_token() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::Admin]);
    let (status, _) = app.get_json("/api/device/v1/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_graphiql_page() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(Request::builder().uri("/graphql/v1").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.to_lowercase().contains("graphiql"));
    assert!(html.contains("/graphql/v1"));
}

// =============================================================================
// GRAPHQL
// =============================================================================

const DATASETS: &str = "query { datasets { id name properties { name type isIndexed } } }";

#[tokio::test]
async fn test_anonymous_datasets_is_forbidden() {
    let app = TestApp::new().await;
    let body = app.graphql(None, DATASETS, json!({})).await;
    assert_eq!(body["errors"][0]["message"], PERMISSION_DENIED_MESSAGE);
    assert_eq!(body["errors"][0]["extensions"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_guest_datasets_is_forbidden() {
    let app = TestApp::new().await;
    let token = app.token(vec![]);
    let body = app.graphql(Some(&token), DATASETS, json!({})).await;
    assert_eq!(body["errors"][0]["message"], PERMISSION_DENIED_MESSAGE);
}

#[tokio::test]
async fn test_datasets_lists_collections() {
    let app = TestApp::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/schema"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"classes": [{
            "class": "Post",
            "description": "Blog post chunks",
            "vectorizer": "none",
            "properties": [
                {"name": "postId", "dataType": ["text"], "indexFilterable": true},
                {"name": "postSequence", "dataType": ["int"], "indexFilterable": false}
            ]
        }]})))
        .mount(&app.upstream)
        .await;

    let token = app.token(vec![Role::User]);
    let body = app.graphql(Some(&token), DATASETS, json!({})).await;
    assert!(body["errors"].is_null(), "unexpected errors: {body}");
    assert_eq!(
        body["data"]["datasets"],
        json!([{
            "id": "Post",
            "name": "Post",
            "properties": [
                {"name": "postId", "type": "text", "isIndexed": true},
                {"name": "postSequence", "type": "integer", "isIndexed": false}
            ]
        }])
    );
}

#[tokio::test]
async fn test_named_missing_dataset_is_empty() {
    let app = TestApp::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/schema/Missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.upstream)
        .await;

    let token = app.token(vec![Role::Admin]);
    let body = app
        .graphql(
            Some(&token),
            "query($n: String) { datasets(name: $n) { name } }",
            json!({"n": "Missing"}),
        )
        .await;
    assert_eq!(body["data"]["datasets"], json!([]));
}

#[tokio::test]
async fn test_dataset_add_requires_admin() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::User]);
    let body = app
        .graphql(
            Some(&token),
            "mutation { dataset { add(dataset: {name: \"Article\"}) { name } } }",
            json!({}),
        )
        .await;
    assert_eq!(body["errors"][0]["message"], PERMISSION_DENIED_MESSAGE);
}

#[tokio::test]
async fn test_posts_rejects_bad_date() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::User]);
    let body = app
        .graphql(
            Some(&token),
            "query { posts(modifiedDate: \"last tuesday\") { postId } }",
            json!({}),
        )
        .await;
    let message = body["errors"][0]["message"].as_str().unwrap();
    assert!(message.contains(INVALID_DATE_MESSAGE), "{message}");
}

const SYNCHRONIZE: &str = "mutation($d: String!) { posts { synchronize(modifiedDate: $d) { id status progress message } } }";

#[tokio::test]
async fn test_synchronize_queues_job() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::Admin]);
    let body = app
        .graphql(Some(&token), SYNCHRONIZE, json!({"d": "2024-01-01T00:00:00"}))
        .await;
    assert!(body["errors"].is_null(), "unexpected errors: {body}");

    let record = &body["data"]["posts"]["synchronize"];
    assert_eq!(record["status"], "pending");
    assert_eq!(record["progress"], 0);
    assert_eq!(
        record["message"],
        "Starting synchronization of posts modified after 2024-01-01T00:00:00+00:00"
    );

    let queued = app.jobs.queued.lock().unwrap();
    assert_eq!(queued.len(), 1);
    let (job, delay) = &queued[0];
    assert_eq!(*delay, std::time::Duration::from_secs(5));
    let payload: SyncPostsPayload =
        serde_json::from_value(job.payload.clone().unwrap()).unwrap();
    assert_eq!(payload.progress_id, record["id"].as_i64().unwrap());
    assert_eq!(payload.modified_after.to_rfc3339(), "2024-01-01T00:00:00+00:00");
}

#[tokio::test]
async fn test_synchronize_invalid_date_fails_record() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::Admin]);
    let body = app
        .graphql(Some(&token), SYNCHRONIZE, json!({"d": "01/02/2024"}))
        .await;

    let record = &body["data"]["posts"]["synchronize"];
    assert_eq!(record["status"], "failed");
    assert_eq!(record["progress"], 100);
    assert_eq!(record["message"], INVALID_DATE_MESSAGE);
    assert!(app.jobs.queued.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_synchronize_forbidden_for_user() {
    let app = TestApp::new().await;
    let token = app.token(vec![Role::User]);
    let body = app
        .graphql(Some(&token), SYNCHRONIZE, json!({"d": "2024-01-01"}))
        .await;
    assert_eq!(body["errors"][0]["message"], PERMISSION_DENIED_MESSAGE);
    assert!(app.progress.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_synchronization_status_polling() {
    let app = TestApp::new().await;
    let admin = app.token(vec![Role::Admin]);
    let body = app
        .graphql(Some(&admin), SYNCHRONIZE, json!({"d": "2024-01-01"}))
        .await;
    let id = body["data"]["posts"]["synchronize"]["id"].as_i64().unwrap();

    let reader = app.token(vec![Role::User]);
    let query = "query($id: Int!) { postSynchronizationStatus(taskId: $id) { id status } }";
    let body = app.graphql(Some(&reader), query, json!({"id": id})).await;
    assert_eq!(body["data"]["postSynchronizationStatus"]["id"], id);
    assert_eq!(body["data"]["postSynchronizationStatus"]["status"], "pending");

    let body = app.graphql(Some(&reader), query, json!({"id": 999})).await;
    assert!(body["data"]["postSynchronizationStatus"].is_null());
}

#[tokio::test]
async fn test_github_issue_counts_are_public() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {
                "all": {"totalCount": 3},
                "closed": {"totalCount": 1},
                "open": {"totalCount": 2}
            }}
        })))
        .mount(&app.upstream)
        .await;

    let body = app
        .graphql(
            None,
            "query { githubIssueCounts { repository all open closed title } }",
            json!({}),
        )
        .await;
    assert!(body["errors"].is_null(), "unexpected errors: {body}");
    let counts = body["data"]["githubIssueCounts"].as_array().unwrap();
    assert_eq!(counts.len(), 4);
    assert!(counts
        .iter()
        .any(|c| c["repository"] == "ThePortfolioAdmin" && c["title"] == "The Django Admin"));
    assert!(counts.iter().all(|c| c["all"] == 3 && c["open"] == 2));
}
