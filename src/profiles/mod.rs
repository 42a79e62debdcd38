//! Read access to author profiles and the sign-up email availability check.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use crate::app::SyncSettings;
use crate::gateway::{Filter, GatewayArc, SelectQuery};
use crate::logger::Logger;
use crate::model::{tables, Profile, UserId};
use crate::platform::runtime::sleep;
use crate::sync::bounded;
use crate::sync::error::{internal_decode, validation, SyncResult};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@ecosnap/profiles"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailCheck {
    Available,
    Taken,
    /// A newer check started during the debounce window; no query was sent.
    Superseded,
}

/// Profile lookups. Cloning is cheap and clones share the debounce sequence.
#[derive(Clone)]
pub struct ProfileDirectory {
    gateway: GatewayArc,
    settings: SyncSettings,
    email_checks: Arc<AtomicU64>,
}

impl ProfileDirectory {
    pub fn new(gateway: GatewayArc, settings: SyncSettings) -> Self {
        Self {
            gateway,
            settings,
            email_checks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The profile with `user_id`, or `None` when no such row exists.
    pub async fn profile(&self, user_id: &UserId) -> SyncResult<Option<Profile>> {
        let query = SelectQuery::from(tables::PROFILES)
            .columns(&["id", "display_name", "username", "avatar_url"])
            .filter(Filter::eq("id", user_id.as_str()));
        let found = bounded(
            self.settings.operation_timeout(),
            self.gateway.maybe_single(&query),
        )
        .await?;
        found
            .map(|row| serde_json::from_value(serde_json::Value::Object(row)))
            .transpose()
            .map_err(|err| internal_decode("profile", err))
    }

    /// Whether `email` is free for a new account.
    ///
    /// Waits for the configured debounce first; when another check starts in
    /// the meantime this one resolves to [`EmailCheck::Superseded`] without
    /// querying, so typing produces one request per pause.
    pub async fn check_email_available(&self, email: &str) -> SyncResult<EmailCheck> {
        let ticket = self.email_checks.fetch_add(1, Ordering::SeqCst) + 1;
        let email = normalize_email(email)?;

        sleep(self.settings.email_check_debounce()).await;
        if self.email_checks.load(Ordering::SeqCst) != ticket {
            return Ok(EmailCheck::Superseded);
        }

        let filters = [Filter::eq("email", email.as_str())];
        let taken = bounded(
            self.settings.operation_timeout(),
            self.gateway.count(tables::PROFILES, &filters),
        )
        .await?;
        LOGGER.debug(format!("email availability checked ({taken} matches)"));
        Ok(if taken == 0 {
            EmailCheck::Available
        } else {
            EmailCheck::Taken
        })
    }
}

fn normalize_email(email: &str) -> SyncResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(validation("E-mail inválido"));
    }
    Ok(email)
}
