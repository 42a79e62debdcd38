#![cfg(target_arch = "wasm32")]

use std::sync::Arc;

use ecosnap_sdk::app::{EcoSnapClient, EcoSnapOptions};
use ecosnap_sdk::feed::PostDraft;
use ecosnap_sdk::gateway::InMemoryGateway;
use ecosnap_sdk::model::{FeedScope, UserId};
use ecosnap_sdk::session::{MemorySession, SessionArc};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn options_reject_non_http_urls() {
    assert!(EcoSnapOptions::new("ftp://example.com", "key").validate().is_err());
    assert!(EcoSnapOptions::new("https://example.com", "key").validate().is_ok());
}

#[wasm_bindgen_test(async)]
async fn create_and_like_in_memory() {
    let session = Arc::new(MemorySession::signed_in(UserId::new("ana")));
    let shared: SessionArc = session;
    let gateway = InMemoryGateway::new()
        .with_session(Arc::clone(&shared))
        .with_hosted_policies();
    let client = EcoSnapClient::builder(Arc::new(gateway), shared).build();

    let feed = client.feed_store(FeedScope::Global);
    let post = feed.create(PostDraft::new("Saw a heron")).await.unwrap().post;
    let like = feed.toggle_like(&post.id).await.unwrap();

    assert!(like.liked);
    assert_eq!(like.count, 1);
}
