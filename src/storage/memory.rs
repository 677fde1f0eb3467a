//! In-memory object store.
//!
//! Substitutable test double for the S3 backend: multipart sessions are
//! tracked in a map and presigned URLs are synthetic `memory://` URIs.
//! Also handy for local development without an S3 endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{CompletedPart, ObjectHead, ObjectStore};
use crate::error::{AppError, Result};

/// Record of a finished multipart upload, kept for assertions in tests.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    pub key: String,
    pub upload_id: String,
    pub parts: Vec<CompletedPart>,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<String, Bytes>,
    /// upload id -> object key of the pending multipart session
    pending: HashMap<String, String>,
    completed: Vec<CompletedUpload>,
    next_upload_id: u64,
}

/// In-memory [`ObjectStore`] implementation.
#[derive(Default)]
pub struct InMemoryObjectStore {
    inner: Mutex<Inner>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed object content directly, standing in for client part PUTs.
    pub fn put_object(&self, key: &str, content: Bytes) {
        let mut inner = self.inner.lock().expect("object store lock poisoned");
        inner.objects.insert(key.to_string(), content);
    }

    /// Finished multipart uploads, in completion order.
    pub fn completed_uploads(&self) -> Vec<CompletedUpload> {
        let inner = self.inner.lock().expect("object store lock poisoned");
        inner.completed.clone()
    }

    /// Whether a multipart session is still open for `upload_id`.
    pub fn has_pending_upload(&self, upload_id: &str) -> bool {
        let inner = self.inner.lock().expect("object store lock poisoned");
        inner.pending.contains_key(upload_id)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn create_multipart_upload(&self, key: &str) -> Result<String> {
        let mut inner = self.inner.lock().expect("object store lock poisoned");
        inner.next_upload_id += 1;
        let upload_id = format!("mem-upload-{}", inner.next_upload_id);
        inner.pending.insert(upload_id.clone(), key.to_string());
        Ok(upload_id)
    }

    async fn presign_part_url(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        _expires_in: Duration,
    ) -> Result<String> {
        // No bookkeeping: re-requests for the same part just mint a new URL.
        Ok(format!("memory://{}/{}/part/{}", key, upload_id, part_number))
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("object store lock poisoned");
        match inner.pending.remove(upload_id) {
            Some(pending_key) if pending_key == key => {}
            Some(pending_key) => {
                // Restore before failing; the session belongs to another key.
                inner.pending.insert(upload_id.to_string(), pending_key);
                return Err(AppError::Storage(format!(
                    "Upload id '{}' does not match key '{}'",
                    upload_id, key
                )));
            }
            None => {
                return Err(AppError::Storage(format!(
                    "No pending multipart upload '{}'",
                    upload_id
                )));
            }
        }

        inner.objects.entry(key.to_string()).or_default();
        inner.completed.push(CompletedUpload {
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            parts: parts.to_vec(),
        });
        Ok(())
    }

    async fn presign_download_url(
        &self,
        key: &str,
        filename: &str,
        _expires_in: Duration,
    ) -> Result<String> {
        Ok(format!("memory://{}/download/{}", key, filename))
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead> {
        let inner = self.inner.lock().expect("object store lock poisoned");
        let content = inner
            .objects
            .get(key)
            .ok_or_else(|| AppError::NotFound(format!("Storage key not found: {}", key)))?;
        Ok(ObjectHead {
            size: content.len() as u64,
            checksum: None,
        })
    }

    async fn get_object_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        let inner = self.inner.lock().expect("object store lock poisoned");
        let content = inner
            .objects
            .get(key)
            .ok_or_else(|| AppError::NotFound(format!("Storage key not found: {}", key)))?;

        let start = (start as usize).min(content.len());
        let end = ((end + 1) as usize).min(content.len());
        Ok(content.slice(start..end))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("object store lock poisoned");
        inner.objects.remove(key);
        Ok(())
    }
}
