use std::sync::Mutex;

use crate::model::UserId;
use crate::util::{ChangeListeners, PartialObserver, Unsubscribe};

use super::{SessionProvider, SessionUser};

/// Session whose state is set directly by the embedding application.
#[derive(Default)]
pub struct MemorySession {
    state: Mutex<Option<(SessionUser, Option<String>)>>,
    listeners: ChangeListeners<Option<SessionUser>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        let session = Self::new();
        session.sign_in(user_id.into(), None);
        session
    }

    pub fn sign_in(&self, user_id: UserId, access_token: Option<String>) {
        self.set_user(SessionUser::new(user_id), access_token);
    }

    pub fn set_user(&self, user: SessionUser, access_token: Option<String>) {
        *self.lock() = Some((user.clone(), access_token));
        self.listeners.notify(&Some(user));
    }

    pub fn sign_out(&self) {
        let previous = self.lock().take();
        if previous.is_some() {
            self.listeners.notify(&None);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(SessionUser, Option<String>)>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionProvider for MemorySession {
    fn current_user(&self) -> Option<SessionUser> {
        self.lock().as_ref().map(|(user, _)| user.clone())
    }

    fn subscribe(&self, observer: PartialObserver<Option<SessionUser>>) -> Unsubscribe {
        if let Some(next) = observer.next.clone() {
            next(&self.current_user());
        }
        self.listeners.add_observer(observer)
    }

    fn access_token(&self) -> Option<String> {
        self.lock().as_ref().and_then(|(_, token)| token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn subscribers_see_current_state_then_changes() {
        let session = MemorySession::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let unsubscribe = session.subscribe(PartialObserver::new().with_next(
            move |user: &Option<SessionUser>| {
                sink.lock()
                    .unwrap()
                    .push(user.as_ref().map(|u| u.id.as_str().to_owned()));
            },
        ));

        session.sign_in(UserId::new("u1"), Some("token".into()));
        session.sign_out();
        session.sign_out();
        unsubscribe();
        session.sign_in(UserId::new("u2"), None);

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[None, Some("u1".to_string()), None]
        );
        assert_eq!(session.current_user_id(), Some(UserId::new("u2")));
        assert_eq!(session.access_token(), None);
    }
}
