use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use super::error::{object_not_found, MediaError, MediaResult};
use super::{MediaFile, MediaHost, UploadedMedia};

/// Media host keeping objects in memory, with failure injection per file name.
#[derive(Default)]
pub struct InMemoryMediaHost {
    state: Mutex<HostState>,
}

#[derive(Default)]
struct HostState {
    objects: BTreeMap<String, Bytes>,
    upload_failures: HashMap<String, MediaError>,
    delete_failures: HashMap<String, MediaError>,
    uploads: usize,
}

impl InMemoryMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload of `file_name` fails with `error` until cleared.
    pub fn fail_upload(&self, file_name: &str, error: MediaError) {
        self.lock()
            .upload_failures
            .insert(file_name.to_owned(), error);
    }

    pub fn fail_delete(&self, handle: &str, error: MediaError) {
        self.lock()
            .delete_failures
            .insert(handle.to_owned(), error);
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.lock().objects.contains_key(handle)
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn upload_count(&self) -> usize {
        self.lock().uploads
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MediaHost for InMemoryMediaHost {
    async fn upload(&self, file: MediaFile) -> MediaResult<UploadedMedia> {
        let mut state = self.lock();
        state.uploads += 1;
        if let Some(error) = state.upload_failures.get(&file.file_name) {
            return Err(error.clone());
        }
        let kind = file.kind();
        let handle = format!("{}/{}", uuid::Uuid::new_v4(), file.file_name);
        state.objects.insert(handle.clone(), file.data);
        Ok(UploadedMedia {
            url: format!("memory://media/{handle}"),
            handle,
            kind,
        })
    }

    async fn delete(&self, handle: &str) -> MediaResult<()> {
        let mut state = self.lock();
        if let Some(error) = state.delete_failures.get(handle) {
            return Err(error.clone());
        }
        state
            .objects
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| object_not_found(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaErrorCode;

    #[tokio::test]
    async fn delete_removes_object_once() {
        let host = InMemoryMediaHost::new();
        let uploaded = host
            .upload(MediaFile::new("heron.jpg", "image/jpeg", vec![0u8; 4]))
            .await
            .unwrap();
        assert!(host.contains(&uploaded.handle));
        assert!(uploaded.url.ends_with("heron.jpg"));

        host.delete(&uploaded.handle).await.unwrap();
        let err = host.delete(&uploaded.handle).await.unwrap_err();
        assert_eq!(err.code, MediaErrorCode::ObjectNotFound);
    }
}
