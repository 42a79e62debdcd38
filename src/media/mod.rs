//! Media hosting: uploads attached files and hands back public URLs.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;

use crate::model::{MediaKind, MediaRef};

pub mod error;
mod in_memory;
mod storage;

pub use error::{MediaError, MediaErrorCode, MediaResult};
pub use in_memory::InMemoryMediaHost;
pub use storage::StorageMediaHost;

/// A file attached to a post draft.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl MediaFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.content_type)
    }
}

/// Where an uploaded file can be fetched from and how to remove it later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    pub handle: String,
    pub kind: MediaKind,
}

impl From<UploadedMedia> for MediaRef {
    fn from(uploaded: UploadedMedia) -> Self {
        MediaRef {
            url: uploaded.url,
            kind: uploaded.kind,
            handle: Some(uploaded.handle),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MediaHost: Send + Sync + 'static {
    async fn upload(&self, file: MediaFile) -> MediaResult<UploadedMedia>;

    async fn delete(&self, handle: &str) -> MediaResult<()>;
}

pub type MediaHostArc = Arc<dyn MediaHost>;

#[derive(Clone, Debug, PartialEq)]
pub struct FailedUpload {
    pub file_name: String,
    pub error: MediaError,
}

/// Some attached files could not be uploaded. The post is still created.
#[derive(Clone, Debug, PartialEq)]
pub struct PartialMediaFailure {
    pub attempted: usize,
    pub failed: Vec<FailedUpload>,
}

impl PartialMediaFailure {
    pub fn uploaded(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

impl fmt::Display for PartialMediaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} de {} arquivos não puderam ser enviados",
            self.failed.len(),
            self.attempted
        )
    }
}

impl std::error::Error for PartialMediaFailure {}

/// Uploads every file concurrently. Successful uploads keep the input order.
pub async fn upload_all(
    host: &dyn MediaHost,
    files: Vec<MediaFile>,
) -> (Vec<UploadedMedia>, Option<PartialMediaFailure>) {
    let attempted = files.len();
    let names: Vec<String> = files.iter().map(|file| file.file_name.clone()).collect();
    let results = join_all(files.into_iter().map(|file| host.upload(file))).await;

    let mut uploaded = Vec::with_capacity(attempted);
    let mut failed = Vec::new();
    for (file_name, result) in names.into_iter().zip(results) {
        match result {
            Ok(media) => uploaded.push(media),
            Err(error) => failed.push(FailedUpload { file_name, error }),
        }
    }

    let warning = (!failed.is_empty()).then_some(PartialMediaFailure { attempted, failed });
    (uploaded, warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::error::unavailable;

    #[tokio::test]
    async fn upload_all_reports_failed_files_only() {
        let host = InMemoryMediaHost::new();
        host.fail_upload("b.mp4", unavailable("bot offline"));

        let (uploaded, warning) = upload_all(
            &host,
            vec![
                MediaFile::new("a.jpg", "image/jpeg", vec![1u8, 2, 3]),
                MediaFile::new("b.mp4", "video/mp4", vec![4u8]),
                MediaFile::new("c.png", "image/png", vec![5u8]),
            ],
        )
        .await;

        assert_eq!(uploaded.len(), 2);
        assert_eq!(uploaded[0].kind, MediaKind::Image);
        let warning = warning.expect("partial failure");
        assert_eq!(warning.uploaded(), 2);
        assert_eq!(warning.failed[0].file_name, "b.mp4");
        assert_eq!(warning.to_string(), "1 de 3 arquivos não puderam ser enviados");
    }

    #[tokio::test]
    async fn no_files_no_warning() {
        let host = InMemoryMediaHost::new();
        let (uploaded, warning) = upload_all(&host, Vec::new()).await;
        assert!(uploaded.is_empty());
        assert!(warning.is_none());
    }
}
