#![cfg(not(target_arch = "wasm32"))]

use ecosnap_sdk::app::{EcoSnapClient, EcoSnapOptions, SyncSettings};
use ecosnap_sdk::model::{FeedScope, PostId};
use httpmock::prelude::*;
use serde_json::json;

async fn signed_in_client(server: &MockServer) -> EcoSnapClient {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password");
            then.status(200).json_body(json!({
                "access_token": "jwt-viewer",
                "refresh_token": "refresh",
                "user": { "id": "viewer", "email": "viewer@example.com" }
            }));
        })
        .await;

    let client = EcoSnapClient::connect(
        EcoSnapOptions::new(server.base_url(), "anon-key"),
        SyncSettings::default(),
    )
    .expect("connect");
    client
        .rest_auth()
        .expect("password auth")
        .sign_in_with_password("viewer@example.com", "secret")
        .await
        .expect("sign in");
    client
}

#[tokio::test]
async fn feed_reads_through_the_rest_endpoint_with_the_session_token() {
    let server = MockServer::start_async().await;
    let client = signed_in_client(&server).await;
    let page = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/posts")
                .header("apikey", "anon-key")
                .header("Authorization", "Bearer jwt-viewer")
                .query_param("community_id", "is.null")
                .query_param("visibility", "eq.public")
                .query_param("viewer_like.user_id", "eq.viewer")
                .query_param("order", "created_at.desc");
            then.status(200).json_body(json!([{
                "id": "p1",
                "user_id": "ana",
                "content": "Saw a heron",
                "created_at": "2024-05-01T09:00:00Z",
                "author": { "id": "ana", "username": "ana" },
                "viewer_like": [{ "user_id": "viewer" }],
                "like_total": [{ "count": 4 }],
                "comment_total": [{ "count": 2 }]
            }]));
        })
        .await;

    let feed = client.feed_store(FeedScope::Global);
    feed.load(FeedScope::Global).await.expect("load");

    page.assert_async().await;
    let post = feed.post(&PostId::new("p1")).expect("post");
    assert!(post.viewer_has_liked);
    assert_eq!(post.like_count, 4);
    assert_eq!(post.comment_count, 2);
    assert!(!feed.snapshot().has_more);
}

#[tokio::test]
async fn delete_hidden_by_row_policy_reports_permission_denied() {
    let server = MockServer::start_async().await;
    let client = signed_in_client(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/posts");
            then.status(200).json_body(json!([{
                "id": "p1",
                "user_id": "ana",
                "content": "x",
                "created_at": "2024-05-01T09:00:00Z"
            }]));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/posts")
                .query_param("id", "eq.p1")
                .query_param("user_id", "eq.viewer");
            then.status(200).json_body(json!([]));
        })
        .await;

    let feed = client.feed_store(FeedScope::Global);
    feed.load(FeedScope::Global).await.unwrap();
    let err = feed.delete(&PostId::new("p1")).await.unwrap_err();

    delete.assert_async().await;
    assert!(err.is_permission_denied());
    assert!(feed.post(&PostId::new("p1")).is_some());
}
