//! Feed Store: the viewer's list of posts for the global feed or one community.
//!
//! ```no_run
//! # use ecosnap_sdk::app::EcoSnapClient;
//! # use ecosnap_sdk::feed::PostDraft;
//! # use ecosnap_sdk::model::FeedScope;
//! # async fn demo(client: EcoSnapClient) -> Result<(), Box<dyn std::error::Error>> {
//! let feed = client.feed_store(FeedScope::Global);
//! feed.load(FeedScope::Global).await?;
//! let created = feed.create(PostDraft::new("Saw a heron")).await?;
//! feed.toggle_like(&created.post.id).await?;
//! # Ok(())
//! # }
//! ```

mod draft;
mod query;
mod store;

pub use draft::PostDraft;
pub use store::FeedStore;

use crate::media::PartialMediaFailure;
use crate::model::{FeedScope, Post, PostId};
use crate::sync::SyncError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    Loading,
    LoadingMore,
    Ready,
    /// The last `load`/`refresh` failed; see [`FeedSnapshot::error`].
    Failed,
}

impl FeedStatus {
    pub fn is_busy(self) -> bool {
        matches!(self, FeedStatus::Loading | FeedStatus::LoadingMore)
    }
}

/// What Presentation renders.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedSnapshot {
    pub scope: FeedScope,
    /// Newest first, unique by id.
    pub posts: Vec<Post>,
    pub status: FeedStatus,
    /// Last fetch failure, cleared by the next successful fetch.
    pub error: Option<SyncError>,
    pub has_more: bool,
}

impl FeedSnapshot {
    pub(crate) fn empty(scope: FeedScope) -> Self {
        Self {
            scope,
            posts: Vec::new(),
            status: FeedStatus::Idle,
            error: None,
            has_more: false,
        }
    }

    pub fn post(&self, post_id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|post| &post.id == post_id)
    }

    pub(crate) fn post_mut(&mut self, post_id: &PostId) -> Option<&mut Post> {
        self.posts.iter_mut().find(|post| &post.id == post_id)
    }
}

/// Result of [`FeedStore::create`].
#[derive(Clone, Debug, PartialEq)]
pub struct CreateOutcome {
    pub post: Post,
    /// Set when some attached files could not be uploaded.
    pub media_warning: Option<PartialMediaFailure>,
}
