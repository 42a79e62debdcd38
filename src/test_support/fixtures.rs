use std::sync::Arc;

use serde_json::{json, Value};

use crate::app::{EcoSnapClient, SyncSettings};
use crate::gateway::{InMemoryGateway, Row};
use crate::media::InMemoryMediaHost;
use crate::model::UserId;
use crate::session::{MemorySession, SessionArc};

/// In-memory backend with the hosted schema's policies, plus a client wired to it.
pub struct World {
    pub gateway: InMemoryGateway,
    pub session: Arc<MemorySession>,
    pub media: Arc<InMemoryMediaHost>,
    pub client: EcoSnapClient,
}

impl World {
    pub fn signed_in(user: &str) -> Self {
        let world = Self::anonymous();
        world.session.sign_in(UserId::new(user), None);
        world
    }

    pub fn anonymous() -> Self {
        Self::with_settings(SyncSettings::default())
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        let session = Arc::new(MemorySession::new());
        let session_arc: SessionArc = session.clone();
        let gateway = InMemoryGateway::new()
            .with_session(Arc::clone(&session_arc))
            .with_hosted_policies();
        let media = Arc::new(InMemoryMediaHost::new());
        let client = EcoSnapClient::builder(Arc::new(gateway.clone()), session_arc)
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

    /// Seeds `likes` like rows for `post_id` from distinct fake users.
    pub fn seed_likes(&self, post_id: &str, count: usize) {
        self.gateway.seed(
            "likes",
            (0..count).map(|n| row_of(json!({ "post_id": post_id, "user_id": format!("fan-{n}") }))),
        );
    }
}

/// A `posts` row in the global public feed.
pub fn post_row(id: &str, author: &str, created_at: &str) -> Row {
    row_of(json!({
        "id": id,
        "user_id": author,
        "content": format!("post {id}"),
        "tags": [],
        "media": [],
        "location": null,
        "community_id": null,
        "visibility": "public",
        "created_at": created_at,
    }))
}

fn row_of(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
