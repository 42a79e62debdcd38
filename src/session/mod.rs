//! Session Provider: who the current viewer is.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::UserId;
use crate::platform::token::{TokenError, TokenProvider, TokenProviderArc};
use crate::util::{PartialObserver, Unsubscribe};

pub mod memory;
pub mod rest;

pub use memory::MemorySession;
pub use rest::RestAuth;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Option<String>,
}

impl SessionUser {
    pub fn new(id: UserId) -> Self {
        Self { id, email: None }
    }
}

pub trait SessionProvider: Send + Sync + 'static {
    /// The signed-in viewer, or `None` when unauthenticated.
    fn current_user(&self) -> Option<SessionUser>;

    /// Observes session changes. The observer is called immediately with the
    /// current value and then after every sign-in or sign-out.
    fn subscribe(&self, observer: PartialObserver<Option<SessionUser>>) -> Unsubscribe;

    /// Bearer token for the current session, if any.
    fn access_token(&self) -> Option<String>;

    fn current_user_id(&self) -> Option<UserId> {
        self.current_user().map(|user| user.id)
    }
}

pub type SessionArc = Arc<dyn SessionProvider>;

/// Exposes a session's access token to the REST adapters.
#[derive(Clone)]
pub struct SessionTokenProvider {
    session: SessionArc,
}

impl SessionTokenProvider {
    pub fn new(session: SessionArc) -> Self {
        Self { session }
    }

    pub fn into_arc(self) -> TokenProviderArc {
        Arc::new(self)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl TokenProvider for SessionTokenProvider {
    async fn get_token(&self) -> Result<Option<String>, TokenError> {
        Ok(self.session.access_token())
    }
}
