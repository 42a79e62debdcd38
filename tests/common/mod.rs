#![allow(dead_code)]

use std::sync::Arc;

use ecosnap_sdk::app::{EcoSnapClient, SyncSettings};
use ecosnap_sdk::gateway::{row, InMemoryGateway, Row};
use ecosnap_sdk::media::InMemoryMediaHost;
use ecosnap_sdk::model::UserId;
use ecosnap_sdk::session::{MemorySession, SessionArc};
use serde_json::Value;

pub struct Backend {
    pub gateway: InMemoryGateway,
    pub session: Arc<MemorySession>,
    pub media: Arc<InMemoryMediaHost>,
    pub client: EcoSnapClient,
}

impl Backend {
    pub fn new() -> Self {
        Self::with_settings(SyncSettings::default())
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        let session = Arc::new(MemorySession::new());
        let shared: SessionArc = session.clone();
        let gateway = InMemoryGateway::new()
            .with_session(Arc::clone(&shared))
            .with_hosted_policies();
        let media = Arc::new(InMemoryMediaHost::new());
        let client = EcoSnapClient::builder(Arc::new(gateway.clone()), shared)
            .with_media_host(media.clone())
            .with_settings(settings)
            .build();
        Self {
            gateway,
            session,
            media,
            client,
        }
    }

    pub fn sign_in(&self, user: &str) {
        self.session.sign_in(UserId::new(user), None);
    }

    pub fn seed_post(&self, id: &str, author: &str, created_at: &str) {
        self.gateway.seed(
            "posts",
            [row([
                ("id", Value::from(id)),
                ("user_id", Value::from(author)),
                ("content", Value::from(format!("post {id}"))),
                ("tags", Value::Array(Vec::new())),
                ("media", Value::Array(Vec::new())),
                ("location", Value::Null),
                ("community_id", Value::Null),
                ("visibility", Value::from("public")),
                ("created_at", Value::from(created_at)),
            ])],
        );
    }

    pub fn seed_likes(&self, post_id: &str, count: usize) {
        let rows: Vec<Row> = (0..count)
            .map(|n| row([("post_id", post_id.to_owned()), ("user_id", format!("fan-{n}"))]))
            .collect();
        self.gateway.seed("likes", rows);
    }
}
