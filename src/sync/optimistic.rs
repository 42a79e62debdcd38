use std::future::Future;

/// Two-phase optimistic mutation of one entity.
///
/// [`Optimistic::apply`] computes the local state to show right away and keeps
/// the pre-image. [`Optimistic::settle`] awaits the server and yields either the
/// reconciled state or the pre-image to restore. Writing the resulting state
/// back into the store is the caller's job, keyed by [`Optimistic::key`].
#[derive(Clone, Debug)]
pub struct Optimistic<K, S> {
    key: K,
    before: S,
    applied: S,
}

/// Outcome of [`Optimistic::settle`].
#[derive(Clone, Debug, PartialEq)]
pub enum Settlement<S, T, E> {
    Committed { state: S, value: T },
    Compensated { state: S, error: E },
}

impl<S, T, E> Settlement<S, T, E> {
    /// State to write back into the store.
    pub fn state(&self) -> &S {
        match self {
            Settlement::Committed { state, .. } | Settlement::Compensated { state, .. } => state,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Settlement::Committed { value, .. } => Ok(value),
            Settlement::Compensated { error, .. } => Err(error),
        }
    }
}

impl<K, S> Optimistic<K, S> {
    pub fn apply(key: K, before: S, delta: impl FnOnce(&S) -> S) -> Self {
        let applied = delta(&before);
        Self {
            key,
            before,
            applied,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn before(&self) -> &S {
        &self.before
    }

    /// The state shown while the server call is in flight.
    pub fn applied(&self) -> &S {
        &self.applied
    }

    /// Awaits `confirm`. On success `reconcile` derives the authoritative state
    /// from the pre-image and the server's answer; on failure the pre-image is
    /// handed back unchanged.
    pub async fn settle<Fut, T, E>(
        self,
        confirm: Fut,
        reconcile: impl FnOnce(&S, &T) -> S,
    ) -> Settlement<S, T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        match confirm.await {
            Ok(value) => Settlement::Committed {
                state: reconcile(&self.before, &value),
                value,
            },
            Err(error) => Settlement::Compensated {
                state: self.before,
                error,
            },
        }
    }
}

/// Like state of one post or comment as seen by the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LikeSnapshot {
    pub liked: bool,
    pub count: u64,
}

impl LikeSnapshot {
    pub fn new(liked: bool, count: u64) -> Self {
        Self { liked, count }
    }

    /// The viewer's like flipped, with the count moved by one. Never underflows.
    pub fn toggled(self) -> Self {
        if self.liked {
            Self::new(false, self.count.saturating_sub(1))
        } else {
            Self::new(true, self.count.saturating_add(1))
        }
    }

    /// Applies the server's answer ("a like row now exists" or not) to the
    /// pre-toggle state. A toggle that found the server already in the target
    /// state leaves the count where it was.
    pub fn reconciled(self, liked_on_server: bool) -> Self {
        match (self.liked, liked_on_server) {
            (false, true) => Self::new(true, self.count.saturating_add(1)),
            (true, false) => Self::new(false, self.count.saturating_sub(1)),
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn toggling_twice_restores_state() {
        let start = LikeSnapshot::new(false, 3);
        assert_eq!(start.toggled(), LikeSnapshot::new(true, 4));
        assert_eq!(start.toggled().toggled(), start);
    }

    #[test]
    fn count_never_underflows() {
        let drifted = LikeSnapshot::new(true, 0);
        assert_eq!(drifted.toggled(), LikeSnapshot::new(false, 0));
        assert_eq!(drifted.reconciled(false), LikeSnapshot::new(false, 0));
    }

    #[test]
    fn settle_commits_reconciled_state() {
        let change = Optimistic::apply("p1", LikeSnapshot::new(false, 3), |s| s.toggled());
        assert_eq!(change.applied(), &LikeSnapshot::new(true, 4));

        let settled = block_on(change.settle(async { Ok::<_, ()>(true) }, |before, liked| {
            before.reconciled(*liked)
        }));
        assert_eq!(settled.state(), &LikeSnapshot::new(true, 4));
        assert_eq!(settled.into_result(), Ok(true));
    }

    #[test]
    fn settle_compensates_with_pre_image() {
        let change = Optimistic::apply("p1", LikeSnapshot::new(false, 3), |s| s.toggled());
        let settled = block_on(change.settle(async { Err::<bool, _>("offline") }, |before, liked| {
            before.reconciled(*liked)
        }));
        assert_eq!(settled.state(), &LikeSnapshot::new(false, 3));
        assert_eq!(settled.into_result(), Err("offline"));
    }
}
