//! Records exchanged with the remote gateway.

mod comment;
mod ids;
mod like;
mod location;
mod media;
mod post;
mod profile;

pub use comment::Comment;
pub use ids::{CommentId, CommunityId, PostId, UserId};
pub use like::{CommentLike, Like};
pub use location::Location;
pub use media::{MediaKind, MediaRef};
pub use post::{Post, Visibility};
pub use profile::Profile;

use std::fmt;

/// Table names of the hosted schema.
pub mod tables {
    pub const POSTS: &str = "posts";
    pub const LIKES: &str = "likes";
    pub const COMMENTS: &str = "comments";
    pub const COMMENT_LIKES: &str = "comment_likes";
    pub const PROFILES: &str = "profiles";
}

/// Which posts a feed shows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeedScope {
    /// Public posts outside any community.
    Global,
    Community(CommunityId),
}

impl FeedScope {
    pub fn community(id: impl Into<CommunityId>) -> Self {
        FeedScope::Community(id.into())
    }

    pub fn community_id(&self) -> Option<&CommunityId> {
        match self {
            FeedScope::Global => None,
            FeedScope::Community(id) => Some(id),
        }
    }
}

impl fmt::Display for FeedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedScope::Global => f.write_str("global"),
            FeedScope::Community(id) => write!(f, "community:{id}"),
        }
    }
}
