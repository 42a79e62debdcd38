use std::sync::{Arc, LazyLock};

use crate::comments::CommentStore;
use crate::feed::FeedStore;
use crate::gateway::connection::Connection;
use crate::gateway::{GatewayArc, RestGateway, RetrySettings};
use crate::logger::Logger;
use crate::media::{InMemoryMediaHost, MediaHostArc, StorageMediaHost};
use crate::model::{FeedScope, PostId};
use crate::profiles::ProfileDirectory;
use crate::session::{RestAuth, SessionArc, SessionTokenProvider};

use super::error::AppResult;
use super::options::EcoSnapOptions;
use super::settings::SyncSettings;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@ecosnap/app"));

/// The collaborators every store needs, constructed once and passed down.
///
/// Stores created from the same client share the gateway, session and media
/// host but nothing else: each feed view and each opened comment section gets
/// its own store.
#[derive(Clone)]
pub struct EcoSnapClient {
    gateway: GatewayArc,
    session: SessionArc,
    media: MediaHostArc,
    settings: SyncSettings,
    auth: Option<Arc<RestAuth>>,
}

pub struct EcoSnapClientBuilder {
    gateway: GatewayArc,
    session: SessionArc,
    media: Option<MediaHostArc>,
    settings: SyncSettings,
}

impl EcoSnapClientBuilder {
    pub fn with_media_host(mut self, media: MediaHostArc) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Without a media host, uploads are kept in memory.
    pub fn build(self) -> EcoSnapClient {
        EcoSnapClient {
            gateway: self.gateway,
            session: self.session,
            media: self
                .media
                .unwrap_or_else(|| Arc::new(InMemoryMediaHost::new())),
            settings: self.settings,
            auth: None,
        }
    }
}

impl EcoSnapClient {
    pub fn builder(gateway: GatewayArc, session: SessionArc) -> EcoSnapClientBuilder {
        EcoSnapClientBuilder {
            gateway,
            session,
            media: None,
            settings: SyncSettings::default(),
        }
    }

    /// Wires the REST adapters for `options`: data gateway, password auth and
    /// object storage, all authenticated with the auth session's token.
    pub fn connect(options: EcoSnapOptions, settings: SyncSettings) -> AppResult<Self> {
        options.validate()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| crate::gateway::error::internal_error(err.to_string()))?;

        let auth = Arc::new(
            RestAuth::new(
                Connection::builder(options.auth_url(), options.anon_key.clone())
                    .with_client(client.clone())
                    .build()?,
            )
            .with_request_timeout(settings.operation_timeout()),
        );
        let session: SessionArc = auth.clone();
        let tokens = SessionTokenProvider::new(Arc::clone(&session)).into_arc();

        // Every attempt of a retried read must fit in one store operation.
        let retry = RetrySettings::default();
        let attempts = u32::try_from(retry.max_attempts.max(1)).unwrap_or(u32::MAX);
        let retry = RetrySettings {
            request_timeout: settings.operation_timeout() / attempts,
            ..retry
        };
        let gateway = RestGateway::builder(options.rest_url(), options.anon_key.clone())
            .with_client(client.clone())
            .with_token_provider(Arc::clone(&tokens))
            .with_retry_settings(retry)
            .build()?;

        let media = StorageMediaHost::new(
            Connection::builder(options.storage_url(), options.anon_key.clone())
                .with_client(client)
                .build()?,
            options.media_bucket.clone(),
        )
        .with_token_provider(tokens);

        LOGGER.info(format!("connected to {}", options.api_url));
        Ok(Self {
            gateway: Arc::new(gateway),
            session,
            media: Arc::new(media),
            settings,
            auth: Some(auth),
        })
    }

    /// Password auth, when the client was created by [`EcoSnapClient::connect`].
    pub fn rest_auth(&self) -> Option<Arc<RestAuth>> {
        self.auth.clone()
    }

    pub fn gateway(&self) -> GatewayArc {
        Arc::clone(&self.gateway)
    }

    pub fn session(&self) -> SessionArc {
        Arc::clone(&self.session)
    }

    pub fn media_host(&self) -> MediaHostArc {
        Arc::clone(&self.media)
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn feed_store(&self, scope: FeedScope) -> FeedStore {
        FeedStore::new(
            scope,
            self.gateway(),
            self.session(),
            self.media_host(),
            self.settings.clone(),
        )
    }

    pub fn comment_store(&self, post_id: PostId) -> CommentStore {
        CommentStore::new(
            post_id,
            self.gateway(),
            self.session(),
            self.settings.clone(),
        )
    }

    pub fn profiles(&self) -> ProfileDirectory {
        ProfileDirectory::new(self.gateway(), self.settings.clone())
    }
}
