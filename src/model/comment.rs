use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::gateway::error::{internal_error, GatewayResult};
use crate::gateway::Row;
use crate::sync::LikeSnapshot;

use super::ids::{CommentId, PostId, UserId};
use super::post::{total, CountRow};
use super::profile::Profile;

#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    /// `None` for top-level comments.
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub author: Option<Profile>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_count: u64,
    pub viewer_has_liked: bool,
    /// Only maintained for top-level comments.
    pub reply_count: u64,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }

    pub fn like_snapshot(&self) -> LikeSnapshot {
        LikeSnapshot::new(self.viewer_has_liked, self.like_count)
    }

    pub fn set_like_snapshot(&mut self, snapshot: LikeSnapshot) {
        self.viewer_has_liked = snapshot.liked;
        self.like_count = snapshot.count;
    }

    /// Decodes a `comments` row hydrated with `author`, `likes` (the
    /// `comment_likes` user ids) and `reply_total`. `viewer` decides
    /// `viewer_has_liked`.
    pub fn from_row(row: Row, viewer: Option<&UserId>) -> GatewayResult<Self> {
        let raw: CommentRow = serde_json::from_value(Value::Object(row))
            .map_err(|err| internal_error(format!("Malformed comment row: {err}")))?;
        let likes = raw.likes.unwrap_or_default();
        let viewer_has_liked =
            viewer.is_some_and(|viewer| likes.iter().any(|like| &like.user_id == viewer));
        Ok(Comment {
            updated_at: raw.updated_at.unwrap_or(raw.created_at),
            id: raw.id,
            post_id: raw.post_id,
            parent_id: raw.parent_id,
            author_id: raw.user_id,
            author: raw.author,
            content: raw.content,
            created_at: raw.created_at,
            like_count: likes.len() as u64,
            viewer_has_liked,
            reply_count: total(&raw.reply_total),
        })
    }
}

#[derive(Deserialize)]
struct CommentRow {
    id: CommentId,
    post_id: PostId,
    #[serde(default)]
    parent_id: Option<CommentId>,
    user_id: UserId,
    #[serde(default)]
    author: Option<Profile>,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    likes: Option<Vec<LikeRow>>,
    #[serde(default)]
    reply_total: Option<Vec<CountRow>>,
}

#[derive(Deserialize)]
struct LikeRow {
    user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn viewer_flag_comes_from_like_rows() {
        let row = json!({
            "id": "c1",
            "post_id": "p1",
            "parent_id": null,
            "user_id": "u1",
            "content": "Que lindo!",
            "created_at": "2024-05-01T09:00:00.000Z",
            "updated_at": "2024-05-01T09:00:00.000Z",
            "likes": [{ "user_id": "u2" }, { "user_id": "u3" }],
            "reply_total": [{ "count": 1 }]
        })
        .as_object()
        .cloned()
        .unwrap();

        let as_u2 = Comment::from_row(row.clone(), Some(&UserId::new("u2"))).unwrap();
        assert_eq!(as_u2.like_snapshot(), LikeSnapshot::new(true, 2));
        assert_eq!(as_u2.reply_count, 1);
        assert!(!as_u2.is_edited());

        let anonymous = Comment::from_row(row, None).unwrap();
        assert!(!anonymous.viewer_has_liked);
    }
}
