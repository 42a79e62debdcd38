use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use serde_json::{json, Map, Value};

use crate::app::SyncSettings;
use crate::gateway::error::permission_denied;
use crate::gateway::{Filter, GatewayArc, GatewayResult};
use crate::logger::Logger;
use crate::media::{upload_all, MediaHostArc, UploadedMedia};
use crate::model::{tables, FeedScope, Like, MediaRef, Post, PostId, UserId};
use crate::session::SessionArc;
use crate::sync::error::{auth_required, gateway_failure, not_loaded, SyncResult};
use crate::sync::{
    bounded, merge_unique, row_exists, toggle_like_row, ChangeListeners, LikeSnapshot, Optimistic,
    PartialObserver, Settlement, Unsubscribe,
};

use super::draft::PostDraft;
use super::query::{in_scope, page_query, post_embeds};
use super::{CreateOutcome, FeedSnapshot, FeedStatus};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@ecosnap/feed"));

/// Ordered, de-duplicated posts of one feed plus the viewer's mutations on them.
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct FeedStore {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    gateway: GatewayArc,
    session: SessionArc,
    media: MediaHostArc,
    settings: SyncSettings,
    state: Mutex<FeedState>,
    listeners: ChangeListeners<FeedSnapshot>,
}

struct FeedState {
    snapshot: FeedSnapshot,
    /// Bumped by every `load`; page results from older loads are dropped.
    generation: u64,
}

impl FeedStore {
    pub fn new(
        scope: FeedScope,
        gateway: GatewayArc,
        session: SessionArc,
        media: MediaHostArc,
        settings: SyncSettings,
    ) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                gateway,
                session,
                media,
                settings,
                state: Mutex::new(FeedState {
                    snapshot: FeedSnapshot::empty(scope),
                    generation: 0,
                }),
                listeners: ChangeListeners::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn scope(&self) -> FeedScope {
        self.lock().snapshot.scope.clone()
    }

    pub fn post(&self, post_id: &PostId) -> Option<Post> {
        self.lock().snapshot.post(post_id).cloned()
    }

    /// Observes every state change. The observer first receives the current snapshot.
    pub fn subscribe(&self, observer: PartialObserver<FeedSnapshot>) -> Unsubscribe {
        if let Some(next) = observer.next.clone() {
            next(&self.snapshot());
        }
        self.inner.listeners.add_observer(observer)
    }

    /// Whether the viewer authored the post, i.e. may be offered a delete action.
    pub fn can_delete(&self, post_id: &PostId) -> bool {
        let Some(viewer) = self.inner.session.current_user_id() else {
            return false;
        };
        self.lock()
            .snapshot
            .post(post_id)
            .is_some_and(|post| post.author_id == viewer)
    }

    /// Replaces the sequence with the first page of `scope`.
    ///
    /// The snapshot switches to `scope` only once its page arrives. On failure
    /// the previous scope and posts stay in place, and the error is kept in the
    /// snapshot as well as returned.
    pub async fn load(&self, scope: FeedScope) -> SyncResult<()> {
        let generation = self.update(|state| {
            state.generation += 1;
            state.snapshot.status = FeedStatus::Loading;
            state.generation
        });
        self.notify();

        let viewer = self.inner.session.current_user_id();
        let limit = self.inner.settings.page_size();
        let result = self.fetch_page(&scope, viewer.as_ref(), 0, limit).await;

        let mut state = self.lock();
        if state.generation != generation {
            LOGGER.debug(format!("dropping superseded {scope} page"));
            return result.map(|_| ());
        }
        match result {
            Ok(posts) => {
                state.snapshot.scope = scope;
                state.snapshot.has_more = posts.len() == limit;
                state.snapshot.posts.clear();
                merge_unique(&mut state.snapshot.posts, posts, |post| post.id.clone());
                state.snapshot.status = FeedStatus::Ready;
                state.snapshot.error = None;
                self.publish(state);
                Ok(())
            }
            Err(err) => {
                LOGGER.warn(format!("loading {scope} feed failed: {err}"));
                state.snapshot.status = FeedStatus::Failed;
                state.snapshot.error = Some(err.clone());
                self.publish(state);
                self.inner.listeners.notify_error(&err);
                Err(err)
            }
        }
    }

    /// Re-fetches the first page of the current scope.
    pub async fn refresh(&self) -> SyncResult<()> {
        self.load(self.scope()).await
    }

    /// Appends the next page, skipping posts already present. Returns how many
    /// posts were added; zero when there is nothing more, a load is running or
    /// the last load failed.
    pub async fn load_more(&self) -> SyncResult<usize> {
        let start = self.update(|state| {
            let snapshot = &mut state.snapshot;
            if !snapshot.has_more
                || snapshot.status.is_busy()
                || snapshot.status == FeedStatus::Failed
            {
                return None;
            }
            snapshot.status = FeedStatus::LoadingMore;
            Some((
                state.generation,
                snapshot.scope.clone(),
                snapshot.posts.len(),
            ))
        });
        let Some((generation, scope, offset)) = start else {
            return Ok(0);
        };
        self.notify();

        let viewer = self.inner.session.current_user_id();
        let limit = self.inner.settings.page_size();
        let result = self.fetch_page(&scope, viewer.as_ref(), offset, limit).await;

        let mut state = self.lock();
        if state.generation != generation {
            return result.map(|_| 0);
        }
        match result {
            Ok(posts) => {
                state.snapshot.has_more = posts.len() == limit;
                let appended =
                    merge_unique(&mut state.snapshot.posts, posts, |post| post.id.clone());
                state.snapshot.status = FeedStatus::Ready;
                state.snapshot.error = None;
                self.publish(state);
                Ok(appended)
            }
            Err(err) => {
                LOGGER.warn(format!("loading more of {scope} failed: {err}"));
                state.snapshot.status = FeedStatus::Ready;
                state.snapshot.error = Some(err.clone());
                self.publish(state);
                self.inner.listeners.notify_error(&err);
                Err(err)
            }
        }
    }

    /// Publishes a post and puts it at the front of the sequence when the
    /// current scope would list it.
    ///
    /// Media uploads are awaited first; files that fail to upload are reported
    /// in [`CreateOutcome::media_warning`] and left out of the post.
    pub async fn create(&self, draft: PostDraft) -> SyncResult<CreateOutcome> {
        let content = draft.normalized_content()?;
        let author = self
            .inner
            .session
            .current_user_id()
            .ok_or_else(auth_required)?;
        let tags = draft.normalized_tags();
        let scope = self.scope();

        let (uploaded, media_warning) = upload_all(self.inner.media.as_ref(), draft.media).await;
        if let Some(warning) = &media_warning {
            LOGGER.warn(format!("creating post with missing media: {warning}"));
        }
        let media: Vec<MediaRef> = uploaded.iter().cloned().map(MediaRef::from).collect();

        let mut values = Map::new();
        values.insert("user_id".into(), json!(author.as_str()));
        values.insert("content".into(), json!(content));
        values.insert("tags".into(), json!(tags));
        values.insert("media".into(), serde_json::to_value(&media).unwrap_or(Value::Null));
        values.insert(
            "location".into(),
            serde_json::to_value(&draft.location).unwrap_or(Value::Null),
        );
        values.insert(
            "community_id".into(),
            json!(scope.community_id().map(|id| id.as_str())),
        );
        values.insert(
            "visibility".into(),
            serde_json::to_value(draft.visibility).unwrap_or(Value::Null),
        );

        let gateway = Arc::clone(&self.inner.gateway);
        let returning = post_embeds(None);
        let inserted = bounded(self.inner.settings.operation_timeout(), async move {
            let row = gateway.insert(tables::POSTS, values, &returning).await?;
            Post::from_row(row)
        })
        .await;

        let post = match inserted {
            Ok(post) => post,
            Err(err) => {
                LOGGER.warn(format!("creating post failed: {err}"));
                self.discard_media(&uploaded).await;
                return Err(err);
            }
        };

        self.update(|state| {
            if !in_scope(&state.snapshot.scope, &post) {
                return;
            }
            let posts = &mut state.snapshot.posts;
            posts.retain(|existing| existing.id != post.id);
            posts.insert(0, post.clone());
        });
        self.notify();
        LOGGER.info(format!("created post {}", post.id));
        Ok(CreateOutcome {
            post,
            media_warning,
        })
    }

    /// Likes or unlikes a post for the viewer.
    ///
    /// The flipped state is visible to subscribers before the gateway is
    /// contacted. A failure restores the previous state and is returned.
    pub async fn toggle_like(&self, post_id: &PostId) -> SyncResult<LikeSnapshot> {
        let viewer = self
            .inner
            .session
            .current_user_id()
            .ok_or_else(auth_required)?;

        let change = {
            let mut state = self.lock();
            let Some(post) = state.snapshot.post_mut(post_id) else {
                return Err(not_loaded(format!("Post {post_id}")));
            };
            let change = Optimistic::apply(post_id.clone(), post.like_snapshot(), |s| s.toggled());
            post.set_like_snapshot(*change.applied());
            self.publish(state);
            change
        };

        let gateway = Arc::clone(&self.inner.gateway);
        let like = Like::new(post_id.clone(), viewer);
        let confirm = bounded(self.inner.settings.operation_timeout(), async move {
            toggle_like_row(gateway.as_ref(), tables::LIKES, &like).await
        });
        let settlement = change
            .settle(confirm, |before, liked| before.reconciled(*liked))
            .await;

        if let Settlement::Compensated { error, .. } = &settlement {
            LOGGER.warn(format!("like on {post_id} rolled back: {error}"));
        }
        let state = *settlement.state();
        self.update(|feed| {
            if let Some(post) = feed.snapshot.post_mut(post_id) {
                post.set_like_snapshot(state);
            }
        });
        self.notify();
        settlement.into_result().map(|_| state)
    }

    /// Deletes one of the viewer's posts. The post leaves the sequence only
    /// after the gateway confirms; its media is then removed best-effort.
    pub async fn delete(&self, post_id: &PostId) -> SyncResult<()> {
        let viewer = self
            .inner
            .session
            .current_user_id()
            .ok_or_else(auth_required)?;
        let media = self
            .post(post_id)
            .map(|post| post.media)
            .ok_or_else(|| not_loaded(format!("Post {post_id}")))?;

        let gateway = Arc::clone(&self.inner.gateway);
        let target = post_id.as_str().to_owned();
        let filters = [
            Filter::eq("id", post_id.as_str()),
            Filter::eq("user_id", viewer.as_str()),
        ];
        let removed = bounded(self.inner.settings.operation_timeout(), async move {
            let rows = gateway.delete(tables::POSTS, &filters).await?;
            if !rows.is_empty() {
                return Ok(true);
            }
            row_exists(gateway.as_ref(), tables::POSTS, &target)
                .await
                .map(|exists| !exists)
        })
        .await
        .and_then(|deleted| {
            if deleted {
                Ok(())
            } else {
                Err(gateway_failure(permission_denied(format!(
                    "Post {post_id} was not deleted"
                ))))
            }
        });

        if let Err(err) = removed {
            LOGGER.warn(format!("deleting post {post_id} failed: {err}"));
            return Err(err);
        }

        self.update(|state| state.snapshot.posts.retain(|post| &post.id != post_id));
        self.notify();
        LOGGER.info(format!("deleted post {post_id}"));

        for handle in media.iter().filter_map(|item| item.handle.as_deref()) {
            if let Err(err) = self.inner.media.delete(handle).await {
                LOGGER.warn(format!("could not remove media {handle}: {err}"));
            }
        }
        Ok(())
    }

    async fn fetch_page(
        &self,
        scope: &FeedScope,
        viewer: Option<&UserId>,
        offset: usize,
        limit: usize,
    ) -> SyncResult<Vec<Post>> {
        let query = page_query(scope, viewer, offset, limit);
        let gateway = Arc::clone(&self.inner.gateway);
        bounded(self.inner.settings.operation_timeout(), async move {
            let rows = gateway.select(&query).await?;
            rows.into_iter()
                .map(Post::from_row)
                .collect::<GatewayResult<Vec<_>>>()
        })
        .await
    }

    async fn discard_media(&self, uploaded: &[UploadedMedia]) {
        for media in uploaded {
            if let Err(err) = self.inner.media.delete(&media.handle).await {
                LOGGER.warn(format!("could not discard media {}: {err}", media.handle));
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update<R>(&self, change: impl FnOnce(&mut FeedState) -> R) -> R {
        let mut state = self.lock();
        change(&mut state)
    }

    /// Releases the lock, then notifies with the snapshot it guarded.
    fn publish(&self, state: MutexGuard<'_, FeedState>) {
        let snapshot = state.snapshot.clone();
        drop(state);
        self.inner.listeners.notify(&snapshot);
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        self.inner.listeners.notify(&snapshot);
    }
}
