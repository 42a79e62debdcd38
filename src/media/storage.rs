use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use serde_json::json;

use crate::gateway::connection::{Connection, RequestContext};
use crate::platform::token::{NoopTokenProvider, TokenProviderArc};

use super::error::{internal_error, invalid_argument, MediaResult};
use super::{MediaFile, MediaHost, UploadedMedia};

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Object storage endpoint (`.../storage/v1`) serving uploads from a public bucket.
pub struct StorageMediaHost {
    connection: Connection,
    bucket: String,
    folder: String,
    token_provider: TokenProviderArc,
    request_timeout: Duration,
}

impl StorageMediaHost {
    pub fn new(connection: Connection, bucket: impl Into<String>) -> Self {
        Self {
            connection,
            bucket: bucket.into(),
            folder: "posts".to_owned(),
            token_provider: std::sync::Arc::new(NoopTokenProvider),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_token_provider(mut self, provider: TokenProviderArc) -> Self {
        self.token_provider = provider;
        self
    }

    /// Prefix for object paths inside the bucket.
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL of an object path.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.connection.base_url(),
            encode_segment(&self.bucket),
            encode_path(path)
        )
    }

    fn object_path(&self, file_name: &str) -> MediaResult<String> {
        let name = file_name
            .rsplit(['/', '\\'])
            .next()
            .map(str::trim)
            .unwrap_or_default();
        if name.is_empty() {
            return Err(invalid_argument("Media file name must not be empty"));
        }
        let folder = self.folder.trim_matches('/');
        let unique = uuid::Uuid::new_v4();
        Ok(if folder.is_empty() {
            format!("{unique}/{name}")
        } else {
            format!("{folder}/{unique}/{name}")
        })
    }

    async fn context(&self) -> MediaResult<RequestContext> {
        let auth_token = self
            .token_provider
            .get_token()
            .await
            .map_err(|err| internal_error(err.to_string()))?;
        Ok(RequestContext {
            auth_token,
            prefer: None,
            request_timeout: Some(self.request_timeout),
        })
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MediaHost for StorageMediaHost {
    async fn upload(&self, file: MediaFile) -> MediaResult<UploadedMedia> {
        if file.data.is_empty() {
            return Err(invalid_argument(format!(
                "Media file '{}' is empty",
                file.file_name
            )));
        }
        let path = self.object_path(&file.file_name)?;
        let kind = file.kind();
        let context = self.context().await?;
        let content_type = if file.content_type.trim().is_empty() {
            "application/octet-stream"
        } else {
            file.content_type.as_str()
        };
        self.connection
            .invoke_bytes(
                Method::POST,
                &format!("object/{}/{}", encode_segment(&self.bucket), encode_path(&path)),
                content_type,
                file.data.clone(),
                &context,
            )
            .await?;
        log::debug!("uploaded media object {path} to bucket {}", self.bucket);
        Ok(UploadedMedia {
            url: self.public_url(&path),
            handle: path,
            kind,
        })
    }

    async fn delete(&self, handle: &str) -> MediaResult<()> {
        let context = self.context().await?;
        self.connection
            .invoke_json(
                Method::DELETE,
                &format!("object/{}", encode_segment(&self.bucket)),
                &[],
                Some(json!({ "prefixes": [handle] })),
                &context,
            )
            .await?;
        Ok(())
    }
}
