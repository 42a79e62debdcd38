//! Reconciliation primitives shared by the feed and comment stores.

use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use crate::gateway::error::deadline_exceeded;
use crate::gateway::{Filter, GatewayResult, RemoteGateway, SelectQuery};
use crate::platform::runtime::with_timeout;

pub mod error;
mod likes;
mod optimistic;

pub use error::{SyncError, SyncErrorCode, SyncResult};
pub(crate) use likes::toggle_like_row;
pub use optimistic::{LikeSnapshot, Optimistic, Settlement};

pub use crate::util::{ChangeListeners, PartialObserver, Unsubscribe};

/// Appends the items of `incoming` whose key is not already present, keeping
/// order. Returns how many items were appended.
pub fn merge_unique<T, K, F>(existing: &mut Vec<T>, incoming: impl IntoIterator<Item = T>, key: F) -> usize
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen: HashSet<K> = existing.iter().map(&key).collect();
    let before = existing.len();
    for item in incoming {
        if seen.insert(key(&item)) {
            existing.push(item);
        }
    }
    existing.len() - before
}

/// Runs one gateway call under the store's operation timeout and lifts its
/// failure into a [`SyncError`].
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> SyncResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match with_timeout(limit, call).await {
        Ok(result) => result.map_err(SyncError::from),
        Err(elapsed) => Err(SyncError::from(deadline_exceeded(format!(
            "Operation did not finish within {:?}",
            elapsed.0
        )))),
    }
}

/// Whether a row with `id` is still readable in `table`.
///
/// Used after an owner-scoped mutation affected no rows: a row that still
/// exists was hidden by a row-level policy, a missing one was already removed.
pub(crate) async fn row_exists(
    gateway: &dyn RemoteGateway,
    table: &str,
    id: &str,
) -> GatewayResult<bool> {
    let query = SelectQuery::from(table)
        .columns(&["id"])
        .filter(Filter::eq("id", id));
    Ok(gateway.maybe_single(&query).await?.is_some())
}
