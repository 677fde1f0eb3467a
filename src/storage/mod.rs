//! Object storage backends.
//!
//! The upload pipeline never proxies file bytes. Clients PUT parts straight
//! to storage through presigned URLs; the server only coordinates the
//! multipart session and inspects small byte ranges for auto review.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::error::Result;

/// One part of a multipart upload, as reported back by the client after
/// its direct-to-storage PUT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompletedPart {
    /// 1-based part number
    pub part_number: u32,
    /// ETag returned by the storage backend for the part PUT
    pub etag: String,
}

/// Object metadata from a head request.
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size: u64,
    /// Backend-reported content checksum (ETag for S3)
    pub checksum: Option<String>,
}

/// Object storage capability consumed by the upload pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Start a multipart upload against `key`, returning the upload id.
    async fn create_multipart_upload(&self, key: &str) -> Result<String>;

    /// Mint a time-limited signed URL for uploading one part.
    async fn presign_part_url(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> Result<String>;

    /// Merge the uploaded parts into the final object.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()>;

    /// Mint a time-limited signed download URL with an attachment filename.
    async fn presign_download_url(
        &self,
        key: &str,
        filename: &str,
        expires_in: Duration,
    ) -> Result<String>;

    /// Object size and checksum without fetching content.
    async fn head_object(&self, key: &str) -> Result<ObjectHead>;

    /// Fetch `[start, end]` (inclusive) bytes of an object.
    async fn get_object_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes>;

    /// Delete an object.
    async fn delete_object(&self, key: &str) -> Result<()>;
}
