//! Comment Store: one post's comments, one level of replies deep.

mod store;
mod validation;

pub use store::CommentStore;
pub use validation::validate_comment;

use crate::model::{Comment, CommentId, PostId};
use crate::sync::SyncError;

/// Per-comment interaction state.
///
/// `Viewing → Editing → Saving → Viewing`, `Editing → Viewing` on cancel, and
/// `Viewing → Deleting → (removed | Viewing)`. Only the author leaves `Viewing`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommentPhase {
    #[default]
    Viewing,
    Editing,
    Saving,
    Deleting,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommentsStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What Presentation renders for a post's comment section.
#[derive(Clone, Debug, PartialEq)]
pub struct CommentsSnapshot {
    pub post_id: PostId,
    /// Oldest first; replies are included and point at a top-level parent.
    pub comments: Vec<Comment>,
    pub status: CommentsStatus,
    pub error: Option<SyncError>,
    phases: Vec<(CommentId, CommentPhase)>,
}

impl CommentsSnapshot {
    pub(crate) fn empty(post_id: PostId) -> Self {
        Self {
            post_id,
            comments: Vec::new(),
            status: CommentsStatus::Idle,
            error: None,
            phases: Vec::new(),
        }
    }

    pub fn comment(&self, comment_id: &CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| &comment.id == comment_id)
    }

    pub(crate) fn comment_mut(&mut self, comment_id: &CommentId) -> Option<&mut Comment> {
        self.comments
            .iter_mut()
            .find(|comment| &comment.id == comment_id)
    }

    pub fn phase(&self, comment_id: &CommentId) -> CommentPhase {
        self.phases
            .iter()
            .find(|(id, _)| id == comment_id)
            .map(|(_, phase)| *phase)
            .unwrap_or_default()
    }

    pub(crate) fn set_phase(&mut self, comment_id: &CommentId, phase: CommentPhase) {
        self.phases.retain(|(id, _)| id != comment_id);
        if phase != CommentPhase::Viewing {
            self.phases.push((comment_id.clone(), phase));
        }
    }

    /// Top-level comment a new reply to `comment_id` hangs under.
    pub(crate) fn thread_root(&self, comment_id: &CommentId) -> Option<CommentId> {
        let mut current = self.comment(comment_id)?;
        // Bounded walk in case stored data contains a parent cycle.
        for _ in 0..self.comments.len() {
            match &current.parent_id {
                None => return Some(current.id.clone()),
                Some(parent) => match self.comment(parent) {
                    Some(next) => current = next,
                    None => return Some(current.id.clone()),
                },
            }
        }
        Some(current.id.clone())
    }

    /// Groups the comments into top-level entries with their flat replies.
    pub fn thread(&self) -> CommentThread {
        let mut entries: Vec<ThreadEntry> = self
            .comments
            .iter()
            .filter(|comment| comment.parent_id.is_none())
            .map(|comment| ThreadEntry {
                comment: comment.clone(),
                replies: Vec::new(),
            })
            .collect();
        for reply in self.comments.iter().filter(|comment| comment.is_reply()) {
            let Some(root) = self.thread_root(&reply.id) else {
                continue;
            };
            if let Some(entry) = entries.iter_mut().find(|entry| entry.comment.id == root) {
                entry.replies.push(reply.clone());
            }
        }
        CommentThread { entries }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThreadEntry {
    pub comment: Comment,
    /// Oldest first.
    pub replies: Vec<Comment>,
}

/// Comments arranged for display: top-level in ascending order, each with its replies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommentThread {
    pub entries: Vec<ThreadEntry>,
}

impl CommentThread {
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| 1 + entry.replies.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Blocking yes/no question shown before a destructive action.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The user answered no; nothing was sent.
    Declined,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EditOutcome {
    Saved(Comment),
    /// Content was blank or identical; the edit was cancelled.
    Unchanged,
}
