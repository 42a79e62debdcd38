//! Configuration and wiring: options, settings and the [`EcoSnapClient`] that
//! hands out stores.

mod client;
mod error;
mod options;
mod settings;

pub use client::{EcoSnapClient, EcoSnapClientBuilder};
pub use error::{AppError, AppResult};
pub use options::{
    EcoSnapOptions, ANON_KEY_ENV, API_URL_ENV, DEFAULT_MEDIA_BUCKET, MEDIA_BUCKET_ENV,
};
pub use settings::{
    SyncSettings, SyncSettingsUpdate, DEFAULT_COMMENT_MAX_CHARS,
    DEFAULT_EMAIL_CHECK_DEBOUNCE_MILLIS, DEFAULT_OPERATION_TIMEOUT_MILLIS, DEFAULT_PAGE_SIZE,
};
