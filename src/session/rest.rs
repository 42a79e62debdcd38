use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::connection::{Connection, RequestContext};
use crate::gateway::error::{internal_error, unauthenticated, GatewayResult};
use crate::gateway::GatewayErrorCode;
use crate::logger::Logger;
use crate::model::UserId;
use crate::util::{ChangeListeners, PartialObserver, Unsubscribe};

use super::{SessionProvider, SessionUser};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@ecosnap/session"));

/// Password sessions against a GoTrue-compatible auth endpoint (`.../auth/v1`).
pub struct RestAuth {
    connection: Connection,
    request_timeout: Duration,
    state: Mutex<Option<AuthState>>,
    listeners: ChangeListeners<Option<SessionUser>>,
}

#[derive(Clone, Debug)]
struct AuthState {
    user: SessionUser,
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for SessionUser {
    fn from(response: UserResponse) -> Self {
        SessionUser {
            id: UserId::new(response.id),
            email: response.email,
        }
    }
}

impl RestAuth {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            request_timeout: Duration::from_secs(15),
            state: Mutex::new(None),
            listeners: ChangeListeners::new(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Signs in with email and password and notifies subscribers.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> GatewayResult<SessionUser> {
        let body = serde_json::to_value(PasswordGrantRequest { email, password })
            .map_err(|err| internal_error(err.to_string()))?;
        let response = self
            .connection
            .invoke_json(
                Method::POST,
                "token",
                &[("grant_type".to_string(), "password".to_string())],
                Some(body),
                &self.context(None),
            )
            .await?;
        let token: TokenResponse = decode(response.body)?;
        let user = SessionUser::from(token.user);
        *self.lock() = Some(AuthState {
            user: user.clone(),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        });
        LOGGER.info(format!("signed in as {}", user.id));
        self.listeners.notify(&Some(user.clone()));
        Ok(user)
    }

    /// Re-reads the signed-in user from the backend. Clears the session when
    /// the backend no longer accepts the token.
    pub async fn reload_user(&self) -> GatewayResult<Option<SessionUser>> {
        let Some(token) = self.access_token() else {
            return Ok(None);
        };
        match self
            .connection
            .invoke_json(Method::GET, "user", &[], None, &self.context(Some(token)))
            .await
        {
            Ok(response) => {
                let user = SessionUser::from(decode::<UserResponse>(response.body)?);
                if let Some(state) = self.lock().as_mut() {
                    state.user = user.clone();
                }
                Ok(Some(user))
            }
            Err(err) if err.code == GatewayErrorCode::Unauthenticated => {
                LOGGER.warn("session token rejected; signing out locally");
                self.clear();
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Ends the session locally, then revokes it on the backend.
    pub async fn sign_out(&self) -> GatewayResult<()> {
        let Some(previous) = self.clear() else {
            return Ok(());
        };
        self.connection
            .invoke_json(
                Method::POST,
                "logout",
                &[],
                None,
                &self.context(Some(previous.access_token)),
            )
            .await
            .map(|_| ())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock()
            .as_ref()
            .and_then(|state| state.refresh_token.clone())
    }

    fn clear(&self) -> Option<AuthState> {
        let previous = self.lock().take();
        if previous.is_some() {
            self.listeners.notify(&None);
        }
        previous
    }

    fn context(&self, auth_token: Option<String>) -> RequestContext {
        RequestContext {
            auth_token,
            prefer: None,
            request_timeout: Some(self.request_timeout),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<AuthState>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> GatewayResult<T> {
    if body.is_null() {
        return Err(unauthenticated("Auth response was empty"));
    }
    serde_json::from_value(body).map_err(|err| internal_error(err.to_string()))
}

impl SessionProvider for RestAuth {
    fn current_user(&self) -> Option<SessionUser> {
        self.lock().as_ref().map(|state| state.user.clone())
    }

    fn subscribe(&self, observer: PartialObserver<Option<SessionUser>>) -> Unsubscribe {
        if let Some(next) = observer.next.clone() {
            next(&self.current_user());
        }
        self.listeners.add_observer(observer)
    }

    fn access_token(&self) -> Option<String> {
        self.lock().as_ref().map(|state| state.access_token.clone())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::test_support::start_mock_server;
    use httpmock::prelude::*;
    use serde_json::json;

    fn auth(server: &MockServer) -> RestAuth {
        RestAuth::new(
            Connection::builder(server.url("/auth/v1"), "anon-key")
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn password_sign_in_stores_session() {
        let server = start_mock_server().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/v1/token")
                    .query_param("grant_type", "password")
                    .json_body(json!({ "email": "ana@example.com", "password": "secret" }));
                then.status(200).json_body(json!({
                    "access_token": "jwt-1",
                    "refresh_token": "refresh-1",
                    "expires_in": 3600,
                    "user": { "id": "u1", "email": "ana@example.com" }
                }));
            })
            .await;

        let auth = auth(&server);
        let user = auth
            .sign_in_with_password("ana@example.com", "secret")
            .await
            .expect("sign in");

        assert_eq!(user.id, UserId::new("u1"));
        assert_eq!(auth.access_token().as_deref(), Some("jwt-1"));
        assert_eq!(auth.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn wrong_password_surfaces_error_and_stays_signed_out() {
        let server = start_mock_server().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/token");
                then.status(400).json_body(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                }));
            })
            .await;

        let auth = auth(&server);
        let err = auth
            .sign_in_with_password("ana@example.com", "nope")
            .await
            .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::InvalidArgument);
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn rejected_token_clears_session_on_reload() {
        let server = start_mock_server().await;
        let _token = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/token");
                then.status(200).json_body(json!({
                    "access_token": "jwt-1",
                    "user": { "id": "u1" }
                }));
            })
            .await;
        let _user = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/auth/v1/user")
                    .header("Authorization", "Bearer jwt-1");
                then.status(401).json_body(json!({ "msg": "invalid JWT" }));
            })
            .await;

        let auth = auth(&server);
        auth.sign_in_with_password("a@b.c", "pw").await.unwrap();
        assert_eq!(auth.reload_user().await.unwrap(), None);
        assert!(auth.current_user().is_none());
    }
}
