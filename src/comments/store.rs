use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::app::SyncSettings;
use crate::gateway::error::{not_found, permission_denied};
use crate::gateway::{
    row, Direction, Embed, Filter, GatewayArc, GatewayResult, Row, SelectQuery,
};
use crate::logger::Logger;
use crate::model::{tables, Comment, CommentId, CommentLike, PostId, UserId};
use crate::session::SessionArc;
use crate::sync::error::{auth_required, gateway_failure, not_loaded, SyncError, SyncResult};
use crate::sync::{
    bounded, row_exists, toggle_like_row, ChangeListeners, LikeSnapshot, Optimistic, PartialObserver,
    Settlement, Unsubscribe,
};

use super::validation::validate_comment;
use super::{
    CommentPhase, CommentsSnapshot, CommentsStatus, ConfirmPrompt, EditOutcome, RemoveOutcome,
};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@ecosnap/comments"));

const REMOVE_PROMPT: &str = "Tem certeza que deseja excluir este comentário?";

fn comment_embeds() -> [Embed; 3] {
    [
        Embed::one("author", tables::PROFILES, "user_id"),
        Embed::many("likes", tables::COMMENT_LIKES, "comment_id", &["user_id"]),
        Embed::count("reply_total", tables::COMMENTS, "parent_id"),
    ]
}

fn not_author() -> SyncError {
    gateway_failure(permission_denied("Only the author can change this comment"))
}

/// Comments of one post. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct CommentStore {
    inner: Arc<CommentInner>,
}

struct CommentInner {
    gateway: GatewayArc,
    session: SessionArc,
    settings: SyncSettings,
    state: Mutex<CommentsSnapshot>,
    listeners: ChangeListeners<CommentsSnapshot>,
}

impl CommentStore {
    pub fn new(
        post_id: PostId,
        gateway: GatewayArc,
        session: SessionArc,
        settings: SyncSettings,
    ) -> Self {
        Self {
            inner: Arc::new(CommentInner {
                gateway,
                session,
                settings,
                state: Mutex::new(CommentsSnapshot::empty(post_id)),
                listeners: ChangeListeners::new(),
            }),
        }
    }

    pub fn post_id(&self) -> PostId {
        self.lock().post_id.clone()
    }

    pub fn snapshot(&self) -> CommentsSnapshot {
        self.lock().clone()
    }

    pub fn phase(&self, comment_id: &CommentId) -> CommentPhase {
        self.lock().phase(comment_id)
    }

    /// Observes every state change. The observer first receives the current snapshot.
    pub fn subscribe(&self, observer: PartialObserver<CommentsSnapshot>) -> Unsubscribe {
        if let Some(next) = observer.next.clone() {
            next(&self.snapshot());
        }
        self.inner.listeners.add_observer(observer)
    }

    /// Fetches every comment of the post, oldest first, replacing local state.
    pub async fn load(&self) -> SyncResult<()> {
        let post_id = self.modify(|state| {
            state.status = CommentsStatus::Loading;
            state.post_id.clone()
        });
        self.notify();

        let viewer = self.inner.session.current_user_id();
        let mut query = SelectQuery::from(tables::COMMENTS)
            .filter(Filter::eq("post_id", post_id.as_str()))
            .order_by("created_at", Direction::Ascending);
        for embed in comment_embeds() {
            query = query.embed(embed);
        }
        let gateway = Arc::clone(&self.inner.gateway);
        let result = bounded(self.inner.settings.operation_timeout(), async move {
            let rows = gateway.select(&query).await?;
            rows.into_iter()
                .map(|row| Comment::from_row(row, viewer.as_ref()))
                .collect::<GatewayResult<Vec<_>>>()
        })
        .await;

        let mut state = self.lock();
        match result {
            Ok(comments) => {
                state.comments = comments;
                state.status = CommentsStatus::Ready;
                state.error = None;
                self.publish(state);
                Ok(())
            }
            Err(err) => {
                LOGGER.warn(format!("loading comments of {post_id} failed: {err}"));
                state.status = CommentsStatus::Failed;
                state.error = Some(err.clone());
                self.publish(state);
                self.inner.listeners.notify_error(&err);
                Err(err)
            }
        }
    }

    /// Posts a comment, or a reply when `parent_id` is set. A reply to a reply
    /// is attached to the top-level comment of that thread.
    ///
    /// The comment appears locally only once the gateway has assigned its id.
    pub async fn add(&self, content: &str, parent_id: Option<&CommentId>) -> SyncResult<Comment> {
        let content = validate_comment(content, self.inner.settings.comment_max_chars())?;
        let viewer = self
            .inner
            .session
            .current_user_id()
            .ok_or_else(auth_required)?;
        let (post_id, root) = {
            let state = self.lock();
            let root = match parent_id {
                Some(parent) => Some(
                    state
                        .thread_root(parent)
                        .ok_or_else(|| not_loaded(format!("Comment {parent}")))?,
                ),
                None => None,
            };
            (state.post_id.clone(), root)
        };

        let values = row([
            ("post_id", Value::from(post_id.as_str())),
            ("parent_id", json!(root.as_ref().map(|id| id.as_str()))),
            ("user_id", Value::from(viewer.as_str())),
            ("content", Value::from(content)),
        ]);
        let gateway = Arc::clone(&self.inner.gateway);
        let returning = comment_embeds();
        let reader = viewer.clone();
        let inserted = bounded(self.inner.settings.operation_timeout(), async move {
            let row = gateway.insert(tables::COMMENTS, values, &returning).await?;
            Comment::from_row(row, Some(&reader))
        })
        .await
        .inspect_err(|err| LOGGER.warn(format!("adding comment to {post_id} failed: {err}")))?;

        self.modify(|state| {
            if let Some(root) = &root {
                if let Some(parent) = state.comment_mut(root) {
                    parent.reply_count = parent.reply_count.saturating_add(1);
                }
            }
            state.comments.retain(|existing| existing.id != inserted.id);
            state.comments.push(inserted.clone());
        });
        self.notify();
        Ok(inserted)
    }

    /// Enters `Editing` for one of the viewer's comments.
    pub fn begin_edit(&self, comment_id: &CommentId) -> SyncResult<()> {
        let viewer = self
            .inner
            .session
            .current_user_id()
            .ok_or_else(auth_required)?;
        {
            let mut state = self.lock();
            let comment = state
                .comment(comment_id)
                .ok_or_else(|| not_loaded(format!("Comment {comment_id}")))?;
            if comment.author_id != viewer {
                return Err(not_author());
            }
            if state.phase(comment_id) != CommentPhase::Viewing {
                return Ok(());
            }
            state.set_phase(comment_id, CommentPhase::Editing);
        }
        self.notify();
        Ok(())
    }

    pub fn cancel_edit(&self, comment_id: &CommentId) {
        let changed = self.modify(|state| {
            if state.phase(comment_id) == CommentPhase::Editing {
                state.set_phase(comment_id, CommentPhase::Viewing);
                true
            } else {
                false
            }
        });
        if changed {
            self.notify();
        }
    }

    /// Saves new content for a comment.
    ///
    /// Blank or unchanged content cancels the edit without a network call. A
    /// failed save returns to `Editing` so the user can retry.
    pub async fn update(&self, comment_id: &CommentId, new_content: &str) -> SyncResult<EditOutcome> {
        let viewer = self
            .inner
            .session
            .current_user_id()
            .ok_or_else(auth_required)?;
        let current = self
            .lock()
            .comment(comment_id)
            .cloned()
            .ok_or_else(|| not_loaded(format!("Comment {comment_id}")))?;
        if current.author_id != viewer {
            return Err(not_author());
        }

        let trimmed = new_content.trim();
        if trimmed.is_empty() || trimmed == current.content {
            self.cancel_edit(comment_id);
            return Ok(EditOutcome::Unchanged);
        }
        let content = validate_comment(trimmed, self.inner.settings.comment_max_chars())?;

        self.update_state(|state| state.set_phase(comment_id, CommentPhase::Saving));

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let patch = row([
            ("content", Value::from(content.clone())),
            ("updated_at", Value::from(now)),
        ]);
        let result = self
            .mutate_owned(comment_id, &viewer, move |gateway, filters| async move {
                gateway.update(tables::COMMENTS, &filters, patch).await
            })
            .await
            .and_then(|rows| {
                if rows.is_empty() {
                    Err(gateway_failure(not_found(format!(
                        "Comment {comment_id} no longer exists"
                    ))))
                } else {
                    Ok(rows)
                }
            });

        match result {
            Ok(rows) => {
                let updated_at = rows
                    .first()
                    .and_then(|row| row.get("updated_at"))
                    .and_then(Value::as_str)
                    .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
                    .unwrap_or_else(Utc::now);
                let saved = self.update_state(|state| {
                    state.set_phase(comment_id, CommentPhase::Viewing);
                    state.comment_mut(comment_id).map(|comment| {
                        comment.content = content;
                        comment.updated_at = updated_at;
                        comment.clone()
                    })
                });
                saved
                    .map(EditOutcome::Saved)
                    .ok_or_else(|| not_loaded(format!("Comment {comment_id}")))
            }
            Err(err) => {
                LOGGER.warn(format!("editing comment {comment_id} failed: {err}"));
                self.update_state(|state| state.set_phase(comment_id, CommentPhase::Editing));
                Err(err)
            }
        }
    }

    /// Deletes one of the viewer's comments after `prompt` confirms.
    ///
    /// Removing a top-level comment drops its replies locally as well; removing
    /// a reply decrements its parent's reply count.
    pub async fn remove(
        &self,
        comment_id: &CommentId,
        prompt: &dyn ConfirmPrompt,
    ) -> SyncResult<RemoveOutcome> {
        let viewer = self
            .inner
            .session
            .current_user_id()
            .ok_or_else(auth_required)?;
        let target = self
            .lock()
            .comment(comment_id)
            .cloned()
            .ok_or_else(|| not_loaded(format!("Comment {comment_id}")))?;
        if target.author_id != viewer {
            return Err(not_author());
        }
        if !prompt.confirm(REMOVE_PROMPT) {
            return Ok(RemoveOutcome::Declined);
        }

        self.update_state(|state| state.set_phase(comment_id, CommentPhase::Deleting));
        let result = self
            .mutate_owned(comment_id, &viewer, |gateway, filters| async move {
                gateway.delete(tables::COMMENTS, &filters).await
            })
            .await;

        match result {
            Ok(_) => {
                self.update_state(|state| {
                    state.set_phase(comment_id, CommentPhase::Viewing);
                    state.comments.retain(|comment| {
                        &comment.id != comment_id
                            && comment.parent_id.as_ref() != Some(comment_id)
                    });
                    if let Some(parent) = target
                        .parent_id
                        .as_ref()
                        .and_then(|parent| state.comment_mut(parent))
                    {
                        parent.reply_count = parent.reply_count.saturating_sub(1);
                    }
                });
                LOGGER.debug(format!("removed comment {comment_id}"));
                Ok(RemoveOutcome::Removed)
            }
            Err(err) => {
                LOGGER.warn(format!("removing comment {comment_id} failed: {err}"));
                self.update_state(|state| state.set_phase(comment_id, CommentPhase::Viewing));
                Err(err)
            }
        }
    }

    /// Likes or unlikes a comment with the same optimistic protocol as posts.
    pub async fn toggle_like(&self, comment_id: &CommentId) -> SyncResult<LikeSnapshot> {
        let viewer = self
            .inner
            .session
            .current_user_id()
            .ok_or_else(auth_required)?;

        let change = {
            let mut state = self.lock();
            let Some(comment) = state.comment_mut(comment_id) else {
                return Err(not_loaded(format!("Comment {comment_id}")));
            };
            let change =
                Optimistic::apply(comment_id.clone(), comment.like_snapshot(), |s| s.toggled());
            comment.set_like_snapshot(*change.applied());
            self.publish(state);
            change
        };

        let gateway = Arc::clone(&self.inner.gateway);
        let like = CommentLike::new(comment_id.clone(), viewer);
        let confirm = bounded(self.inner.settings.operation_timeout(), async move {
            toggle_like_row(gateway.as_ref(), tables::COMMENT_LIKES, &like).await
        });
        let settlement = change
            .settle(confirm, |before, liked| before.reconciled(*liked))
            .await;

        if let Settlement::Compensated { error, .. } = &settlement {
            LOGGER.warn(format!("like on comment {comment_id} rolled back: {error}"));
        }
        let state = *settlement.state();
        self.update_state(|comments| {
            if let Some(comment) = comments.comment_mut(comment_id) {
                comment.set_like_snapshot(state);
            }
        });
        settlement.into_result().map(|_| state)
    }

    /// Runs an update/delete scoped to the viewer's own row.
    ///
    /// When no row was affected and the comment is still readable, a row-level
    /// policy hid it and the call is reported as denied. When it is gone, the
    /// empty result is returned.
    async fn mutate_owned<F, Fut>(
        &self,
        comment_id: &CommentId,
        viewer: &UserId,
        call: F,
    ) -> SyncResult<Vec<Row>>
    where
        F: FnOnce(GatewayArc, Vec<Filter>) -> Fut,
        Fut: std::future::Future<Output = GatewayResult<Vec<Row>>>,
    {
        let filters = vec![
            Filter::eq("id", comment_id.as_str()),
            Filter::eq("user_id", viewer.as_str()),
        ];
        let rows = bounded(
            self.inner.settings.operation_timeout(),
            call(Arc::clone(&self.inner.gateway), filters),
        )
        .await?;
        if !rows.is_empty() {
            return Ok(rows);
        }
        let exists = bounded(
            self.inner.settings.operation_timeout(),
            row_exists(self.inner.gateway.as_ref(), tables::COMMENTS, comment_id.as_str()),
        )
        .await?;
        if exists {
            return Err(gateway_failure(permission_denied(format!(
                "Comment {comment_id} was not changed"
            ))));
        }
        Ok(rows)
    }

    fn lock(&self) -> MutexGuard<'_, CommentsSnapshot> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn modify<R>(&self, change: impl FnOnce(&mut CommentsSnapshot) -> R) -> R {
        let mut state = self.lock();
        change(&mut state)
    }

    /// Applies `change` and notifies subscribers.
    fn update_state<R>(&self, change: impl FnOnce(&mut CommentsSnapshot) -> R) -> R {
        let result = self.modify(change);
        self.notify();
        result
    }

    fn publish(&self, state: MutexGuard<'_, CommentsSnapshot>) {
        let snapshot = state.clone();
        drop(state);
        self.inner.listeners.notify(&snapshot);
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        self.inner.listeners.notify(&snapshot);
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::gateway::error::unavailable;
    use crate::gateway::Operation;
    use crate::sync::SyncErrorCode;
    use crate::test_support::{post_row, World};

    fn world_with_post(viewer: &str) -> (World, CommentStore) {
        let world = World::signed_in(viewer);
        world
            .gateway
            .seed("posts", [post_row("p1", "ana", "2024-05-01T09:00:00.000Z")]);
        let store = world.client.comment_store(PostId::new("p1"));
        (world, store)
    }

    fn seed_comment(world: &World, id: &str, author: &str, created_at: &str) {
        world.gateway.seed(
            "comments",
            [row([
                ("id", id),
                ("post_id", "p1"),
                ("user_id", author),
                ("content", "que lindo"),
                ("created_at", created_at),
            ])],
        );
    }

    #[tokio::test]
    async fn load_orders_oldest_first_and_reads_counts() {
        let (world, store) = world_with_post("viewer");
        seed_comment(&world, "c2", "bia", "2024-05-01T11:00:00.000Z");
        seed_comment(&world, "c1", "bia", "2024-05-01T10:00:00.000Z");
        world.gateway.seed(
            "comment_likes",
            [row([("comment_id", "c1"), ("user_id", "viewer")])],
        );

        store.load().await.unwrap();

        let snapshot = store.snapshot();
        let ids: Vec<&str> = snapshot.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2"]);
        assert_eq!(snapshot.status, CommentsStatus::Ready);
        let first = snapshot.comment(&CommentId::new("c1")).unwrap();
        assert_eq!(first.like_snapshot(), LikeSnapshot::new(true, 1));
    }

    #[tokio::test]
    async fn replies_to_replies_attach_to_the_thread_root() {
        let (_world, store) = world_with_post("viewer");
        let top = store.add("Que garça linda", None).await.unwrap();
        let reply = store.add("Concordo", Some(&top.id)).await.unwrap();
        let nested = store.add("Eu também", Some(&reply.id)).await.unwrap();

        assert_eq!(reply.parent_id.as_ref(), Some(&top.id));
        assert_eq!(nested.parent_id.as_ref(), Some(&top.id));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.comment(&top.id).unwrap().reply_count, 2);
        let thread = snapshot.thread();
        assert_eq!(thread.entries.len(), 1);
        assert_eq!(thread.entries[0].replies.len(), 2);
        assert_eq!(thread.len(), 3);
    }

    #[tokio::test]
    async fn reply_to_unknown_comment_is_rejected_locally() {
        let (world, store) = world_with_post("viewer");
        let err = store
            .add("oi", Some(&CommentId::new("missing")))
            .await
            .unwrap_err();
        assert_eq!(err.code, SyncErrorCode::NotLoaded);
        assert_eq!(world.gateway.request_count(), 0);
    }

    #[tokio::test]
    async fn length_limit_is_checked_before_any_request() {
        let (world, store) = world_with_post("viewer");

        let err = store.add(&"a".repeat(1001), None).await.unwrap_err();
        assert_eq!(err.code, SyncErrorCode::Validation);
        assert_eq!(world.gateway.request_count(), 0);

        let saved = store.add(&"a".repeat(1000), None).await.unwrap();
        assert_eq!(saved.content.chars().count(), 1000);
    }

    #[tokio::test]
    async fn anonymous_viewer_cannot_comment() {
        let world = World::anonymous();
        let store = world.client.comment_store(PostId::new("p1"));
        let err = store.add("oi", None).await.unwrap_err();
        assert_eq!(err.code, SyncErrorCode::AuthRequired);
        assert_eq!(world.gateway.request_count(), 0);
    }

    #[tokio::test]
    async fn edit_walks_through_phases() {
        let (_world, store) = world_with_post("viewer");
        let comment = store.add("primeira versão", None).await.unwrap();

        store.begin_edit(&comment.id).unwrap();
        assert_eq!(store.phase(&comment.id), CommentPhase::Editing);

        let outcome = store.update(&comment.id, "  primeira versão ").await.unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
        assert_eq!(store.phase(&comment.id), CommentPhase::Viewing);

        store.begin_edit(&comment.id).unwrap();
        let EditOutcome::Saved(saved) = store.update(&comment.id, "segunda versão").await.unwrap()
        else {
            panic!("expected a saved edit");
        };
        assert_eq!(saved.content, "segunda versão");
        assert_eq!(store.phase(&comment.id), CommentPhase::Viewing);
        assert_eq!(
            store.snapshot().comment(&comment.id).unwrap().content,
            "segunda versão"
        );
    }

    #[tokio::test]
    async fn failed_save_returns_to_editing() {
        let (world, store) = world_with_post("viewer");
        let comment = store.add("texto", None).await.unwrap();
        store.begin_edit(&comment.id).unwrap();

        world
            .gateway
            .fail_next(Operation::Update, "comments", unavailable("offline"));
        let err = store.update(&comment.id, "novo texto").await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(store.phase(&comment.id), CommentPhase::Editing);
        assert_eq!(store.snapshot().comment(&comment.id).unwrap().content, "texto");
    }

    #[tokio::test]
    async fn only_the_author_may_edit_or_remove() {
        let (world, store) = world_with_post("viewer");
        seed_comment(&world, "c1", "bia", "2024-05-01T10:00:00.000Z");
        store.load().await.unwrap();
        let before = world.gateway.request_count();
        let id = CommentId::new("c1");

        assert!(store.begin_edit(&id).unwrap_err().is_permission_denied());
        assert!(store
            .remove(&id, &|_: &str| true)
            .await
            .unwrap_err()
            .is_permission_denied());
        assert_eq!(store.phase(&id), CommentPhase::Viewing);
        assert_eq!(world.gateway.request_count(), before);
    }

    #[tokio::test]
    async fn declined_prompt_sends_nothing() {
        let (world, store) = world_with_post("viewer");
        let comment = store.add("fica", None).await.unwrap();
        let before = world.gateway.request_count();

        let asked = Arc::new(Mutex::new(None));
        let record = Arc::clone(&asked);
        let prompt = move |message: &str| {
            *record.lock().unwrap() = Some(message.to_owned());
            false
        };
        let outcome = store.remove(&comment.id, &prompt).await.unwrap();

        assert_eq!(outcome, RemoveOutcome::Declined);
        assert_eq!(asked.lock().unwrap().as_deref(), Some(REMOVE_PROMPT));
        assert_eq!(world.gateway.request_count(), before);
        assert!(store.snapshot().comment(&comment.id).is_some());
    }

    #[tokio::test]
    async fn removing_a_reply_updates_the_parent_count() {
        let (world, store) = world_with_post("viewer");
        let top = store.add("topo", None).await.unwrap();
        let reply = store.add("resposta", Some(&top.id)).await.unwrap();

        let outcome = store.remove(&reply.id, &|_: &str| true).await.unwrap();

        assert_eq!(outcome, RemoveOutcome::Removed);
        let snapshot = store.snapshot();
        assert!(snapshot.comment(&reply.id).is_none());
        assert_eq!(snapshot.comment(&top.id).unwrap().reply_count, 0);
        assert_eq!(world.gateway.rows("comments").len(), 1);
    }

    #[tokio::test]
    async fn removing_a_thread_drops_its_replies_locally() {
        let (_world, store) = world_with_post("viewer");
        let top = store.add("topo", None).await.unwrap();
        store.add("resposta", Some(&top.id)).await.unwrap();

        store.remove(&top.id, &|_: &str| true).await.unwrap();

        assert!(store.snapshot().comments.is_empty());
    }

    #[tokio::test]
    async fn comment_like_rolls_back_on_failure() {
        let (world, store) = world_with_post("viewer");
        let comment = store.add("curta", None).await.unwrap();

        assert_eq!(
            store.toggle_like(&comment.id).await.unwrap(),
            LikeSnapshot::new(true, 1)
        );

        world
            .gateway
            .fail_next(Operation::Delete, "comment_likes", unavailable("offline"));
        assert!(store.toggle_like(&comment.id).await.is_err());
        assert_eq!(
            store.snapshot().comment(&comment.id).unwrap().like_snapshot(),
            LikeSnapshot::new(true, 1)
        );
    }

    #[tokio::test]
    async fn failed_load_keeps_loaded_comments() {
        let (world, store) = world_with_post("viewer");
        seed_comment(&world, "c1", "bia", "2024-05-01T10:00:00.000Z");
        store.load().await.unwrap();

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let _unsubscribe = store.subscribe(
            PartialObserver::new().with_error(move |err| sink.lock().unwrap().push(err.to_string())),
        );
        world
            .gateway
            .fail_next(Operation::Select, "comments", unavailable("offline"));
        let err = store.load().await.unwrap_err();

        let snapshot = store.snapshot();
        assert!(err.is_retryable());
        assert_eq!(snapshot.status, CommentsStatus::Failed);
        assert_eq!(snapshot.error, Some(err.clone()));
        assert_eq!(snapshot.comments.len(), 1);
        assert_eq!(errors.lock().unwrap().clone(), vec![err.to_string()]);
    }

    #[tokio::test]
    async fn removing_an_already_deleted_comment_succeeds() {
        use crate::gateway::RemoteGateway;

        let (world, store) = world_with_post("viewer");
        let comment = store.add("some", None).await.unwrap();
        world
            .gateway
            .delete("comments", &[Filter::eq("id", comment.id.as_str())])
            .await
            .unwrap();

        let outcome = store.remove(&comment.id, &|_: &str| true).await.unwrap();

        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(store.snapshot().comments.is_empty());
    }

    #[tokio::test]
    async fn editing_a_deleted_comment_reports_not_found() {
        use crate::gateway::{GatewayErrorCode, RemoteGateway};

        let (world, store) = world_with_post("viewer");
        let comment = store.add("texto", None).await.unwrap();
        store.begin_edit(&comment.id).unwrap();
        world
            .gateway
            .delete("comments", &[Filter::eq("id", comment.id.as_str())])
            .await
            .unwrap();

        let err = store.update(&comment.id, "novo texto").await.unwrap_err();

        assert_eq!(err.gateway.unwrap().code, GatewayErrorCode::NotFound);
        assert_eq!(store.phase(&comment.id), CommentPhase::Editing);
    }
}
