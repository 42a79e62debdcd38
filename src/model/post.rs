use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::error::{internal_error, GatewayResult};
use crate::gateway::Row;
use crate::sync::LikeSnapshot;

use super::ids::{CommunityId, PostId, UserId};
use super::location::{lenient_location, Location};
use super::media::MediaRef;
use super::profile::Profile;

/// Who can read a post in the global feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
    Private,
}

/// A feed entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    /// Author profile embedded by the feed query; `None` if the profile row is missing.
    pub author: Option<Profile>,
    pub content: String,
    pub tags: Vec<String>,
    pub media: Vec<MediaRef>,
    pub location: Option<Location>,
    /// `None` for the global feed.
    pub community_id: Option<CommunityId>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub comment_count: u64,
    pub viewer_has_liked: bool,
}

impl Post {
    pub fn like_snapshot(&self) -> LikeSnapshot {
        LikeSnapshot::new(self.viewer_has_liked, self.like_count)
    }

    pub fn set_like_snapshot(&mut self, snapshot: LikeSnapshot) {
        self.viewer_has_liked = snapshot.liked;
        self.like_count = snapshot.count;
    }

    /// Decodes a `posts` row hydrated with the feed embeds
    /// (`author`, `viewer_like`, `like_total`, `comment_total`).
    pub fn from_row(row: Row) -> GatewayResult<Self> {
        let raw: PostRow = serde_json::from_value(Value::Object(row))
            .map_err(|err| internal_error(format!("Malformed post row: {err}")))?;
        Ok(Post {
            id: raw.id,
            author_id: raw.user_id,
            author: raw.author,
            content: raw.content,
            tags: raw.tags.unwrap_or_default(),
            media: raw.media.unwrap_or_default(),
            location: raw.location,
            community_id: raw.community_id,
            visibility: raw.visibility.unwrap_or_default(),
            created_at: raw.created_at,
            like_count: total(&raw.like_total),
            comment_count: total(&raw.comment_total),
            viewer_has_liked: raw.viewer_like.is_some_and(|likes| !likes.is_empty()),
        })
    }
}

/// Aggregate embed shape, `[{"count": n}]`.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CountRow {
    #[serde(default)]
    pub count: i64,
}

/// Reads an aggregate embed; negative or absent counts read as zero.
pub(crate) fn total(rows: &Option<Vec<CountRow>>) -> u64 {
    rows.as_ref()
        .and_then(|rows| rows.first())
        .map(|row| u64::try_from(row.count).unwrap_or(0))
        .unwrap_or(0)
}

#[derive(Deserialize)]
struct PostRow {
    id: PostId,
    user_id: UserId,
    #[serde(default)]
    author: Option<Profile>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    media: Option<Vec<MediaRef>>,
    #[serde(default, deserialize_with = "lenient_location")]
    location: Option<Location>,
    #[serde(default)]
    community_id: Option<CommunityId>,
    #[serde(default)]
    visibility: Option<Visibility>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    viewer_like: Option<Vec<Value>>,
    #[serde(default)]
    like_total: Option<Vec<CountRow>>,
    #[serde(default)]
    comment_total: Option<Vec<CountRow>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> GatewayResult<Post> {
        Post::from_row(value.as_object().cloned().unwrap())
    }

    #[test]
    fn decodes_hydrated_row() {
        let post = decode(json!({
            "id": "p1",
            "user_id": "u1",
            "content": "Saw a heron",
            "tags": ["aves"],
            "media": [{ "url": "https://cdn/x.jpg", "kind": "image" }],
            "location": { "name": "Lagoa", "latitude": -23.5, "longitude": -46.6 },
            "community_id": null,
            "visibility": "public",
            "created_at": "2024-05-01T09:00:00.000Z",
            "author": { "id": "u1", "username": "ana" },
            "viewer_like": [{ "user_id": "u2" }],
            "like_total": [{ "count": 3 }],
            "comment_total": [{ "count": 2 }]
        }))
        .unwrap();

        assert_eq!(post.author_id, UserId::new("u1"));
        assert_eq!(post.like_snapshot(), LikeSnapshot::new(true, 3));
        assert_eq!(post.comment_count, 2);
        assert_eq!(post.location.unwrap().name, "Lagoa");
        assert_eq!(post.author.unwrap().label(), "ana");
    }

    #[test]
    fn tolerates_legacy_location_and_missing_embeds() {
        let post = decode(json!({
            "id": "p1",
            "user_id": "u1",
            "content": "x",
            "location": "Parque",
            "like_total": [{ "count": -2 }],
            "created_at": "2024-05-01T09:00:00Z"
        }))
        .unwrap();

        assert_eq!(post.location, None);
        assert_eq!(post.like_count, 0);
        assert!(!post.viewer_has_liked);
        assert!(post.tags.is_empty());
    }

    #[test]
    fn rejects_rows_without_id() {
        let err = decode(json!({ "user_id": "u1", "created_at": "2024-05-01T09:00:00Z" }))
            .unwrap_err();
        assert_eq!(err.code, crate::gateway::GatewayErrorCode::Internal);
    }
}
