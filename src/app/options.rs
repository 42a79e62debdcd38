use std::env;

use super::error::{AppError, AppResult};

pub const API_URL_ENV: &str = "ECOSNAP_API_URL";
pub const ANON_KEY_ENV: &str = "ECOSNAP_ANON_KEY";
pub const MEDIA_BUCKET_ENV: &str = "ECOSNAP_MEDIA_BUCKET";
pub const DEFAULT_MEDIA_BUCKET: &str = "post-media";

/// Where the hosted backend lives and how to identify against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcoSnapOptions {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub api_url: String,
    /// Public (anonymous) API key sent with every request.
    pub anon_key: String,
    pub media_bucket: String,
}

impl EcoSnapOptions {
    pub fn new(api_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            anon_key: anon_key.into(),
            media_bucket: DEFAULT_MEDIA_BUCKET.to_owned(),
        }
    }

    pub fn with_media_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.media_bucket = bucket.into();
        self
    }

    /// Reads `ECOSNAP_API_URL`, `ECOSNAP_ANON_KEY` and optionally `ECOSNAP_MEDIA_BUCKET`.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let read = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let options = Self {
            api_url: read(API_URL_ENV).ok_or(AppError::MissingOption { name: API_URL_ENV })?,
            anon_key: read(ANON_KEY_ENV).ok_or(AppError::MissingOption { name: ANON_KEY_ENV })?,
            media_bucket: read(MEDIA_BUCKET_ENV).unwrap_or_else(|| DEFAULT_MEDIA_BUCKET.to_owned()),
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> AppResult<()> {
        let parsed = url::Url::parse(&self.api_url).map_err(|err| AppError::InvalidOption {
            name: "api_url",
            message: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::InvalidOption {
                name: "api_url",
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if self.anon_key.trim().is_empty() {
            return Err(AppError::MissingOption { name: "anon_key" });
        }
        if self.media_bucket.trim().is_empty() || self.media_bucket.contains('/') {
            return Err(AppError::InvalidOption {
                name: "media_bucket",
                message: format!("'{}' is not a bucket name", self.media_bucket),
            });
        }
        Ok(())
    }

    pub fn rest_url(&self) -> String {
        self.endpoint("rest/v1")
    }

    pub fn auth_url(&self) -> String {
        self.endpoint("auth/v1")
    }

    pub fn storage_url(&self) -> String {
        self.endpoint("storage/v1")
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url.trim_end_matches('/'))
    }
}
