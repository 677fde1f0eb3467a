//! S3 object storage backend using the rust-s3 crate.
//!
//! Supports AWS S3 and S3-compatible services (MinIO, R2, etc.).
//! Multipart uploads are client-driven: the server initiates the upload,
//! presigns one PUT URL per part, and completes the merge once the client
//! reports its collected part ETags.

use async_trait::async_trait;
use bytes::Bytes;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use s3::serde_types::Part;
use std::collections::HashMap;
use std::time::Duration;

use super::{CompletedPart, ObjectHead, ObjectStore};
use crate::config::Config;
use crate::error::{AppError, Result};

/// S3-compatible object storage backend
pub struct S3Store {
    bucket: Box<Bucket>,
    prefix: Option<String>,
}

impl S3Store {
    /// Create the backend from application configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        // Explicit credentials when configured, otherwise the default chain:
        // env vars -> ~/.aws/credentials -> container/instance metadata
        let credentials = match (&config.s3_access_key, &config.s3_secret_key) {
            (Some(ak), Some(sk)) => Credentials::new(Some(ak), Some(sk), None, None, None)
                .map_err(|e| AppError::Config(format!("Invalid S3 credentials: {}", e)))?,
            _ => Credentials::default()
                .map_err(|e| AppError::Config(format!("Failed to load S3 credentials: {}", e)))?,
        };

        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config.s3_region.parse().map_err(|_| {
                AppError::Config(format!("Invalid S3 region: {}", config.s3_region))
            })?,
        };

        let bucket = Bucket::new(&config.s3_bucket, region, credentials)
            .map_err(|e| AppError::Config(format!("Failed to create S3 bucket: {}", e)))?;

        // Path-style access for MinIO and other custom endpoints
        let bucket = if config.s3_endpoint.is_some() {
            bucket.with_path_style()
        } else {
            bucket
        };

        tracing::info!(
            bucket = %config.s3_bucket,
            endpoint = ?config.s3_endpoint,
            "S3 object store configured"
        );

        Ok(Self {
            bucket,
            prefix: config.s3_prefix.clone(),
        })
    }

    /// Generate the full S3 key with optional prefix
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key.to_string(),
        }
    }

    fn is_not_found(err: &str) -> bool {
        err.contains("404") || err.contains("NoSuchKey") || err.contains("Not Found")
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn create_multipart_upload(&self, key: &str) -> Result<String> {
        let full_key = self.full_key(key);

        let response = self
            .bucket
            .initiate_multipart_upload(&full_key, "application/octet-stream")
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to start multipart upload '{}': {}", key, e))
            })?;

        tracing::debug!(key = %key, upload_id = %response.upload_id, "S3 multipart upload started");
        Ok(response.upload_id)
    }

    async fn presign_part_url(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> Result<String> {
        let full_key = self.full_key(key);
        let expiry_secs = expires_in.as_secs().min(604800) as u32; // Max 7 days for S3

        let mut queries = HashMap::new();
        queries.insert("partNumber".to_string(), part_number.to_string());
        queries.insert("uploadId".to_string(), upload_id.to_string());

        let url = self
            .bucket
            .presign_put(&full_key, expiry_secs, None, Some(queries))
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to presign part {} of '{}': {}",
                    part_number, key, e
                ))
            })?;

        tracing::debug!(
            key = %key,
            part_number = part_number,
            expires_in_secs = expiry_secs,
            "Generated presigned part URL"
        );
        Ok(url)
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()> {
        let full_key = self.full_key(key);

        let parts: Vec<Part> = parts
            .iter()
            .map(|p| Part {
                part_number: p.part_number,
                etag: p.etag.clone(),
            })
            .collect();

        self.bucket
            .complete_multipart_upload(&full_key, upload_id, parts)
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to complete multipart upload '{}': {}",
                    key, e
                ))
            })?;

        tracing::debug!(key = %key, "S3 multipart upload completed");
        Ok(())
    }

    async fn presign_download_url(
        &self,
        key: &str,
        filename: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let full_key = self.full_key(key);
        let expiry_secs = expires_in.as_secs().min(604800) as u32;

        let mut queries = HashMap::new();
        queries.insert(
            "response-content-disposition".to_string(),
            format!("attachment; filename=\"{}\"", filename.replace('"', "")),
        );

        let url = self
            .bucket
            .presign_get(&full_key, expiry_secs, Some(queries))
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to presign download of '{}': {}", key, e))
            })?;

        tracing::debug!(key = %key, expires_in_secs = expiry_secs, "Generated presigned download URL");
        Ok(url)
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead> {
        let full_key = self.full_key(key);

        let (head, _) = self.bucket.head_object(&full_key).await.map_err(|e| {
            let err_str = e.to_string();
            if Self::is_not_found(&err_str) {
                AppError::NotFound(format!("Storage key not found: {}", key))
            } else {
                AppError::Storage(format!("Failed to head object '{}': {}", key, e))
            }
        })?;

        let size = head.content_length.unwrap_or(0) as u64;
        tracing::debug!(key = %key, size = size, "S3 head object successful");

        Ok(ObjectHead {
            size,
            checksum: head.e_tag.map(|t| t.trim_matches('"').to_string()),
        })
    }

    async fn get_object_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        let full_key = self.full_key(key);

        let response = self
            .bucket
            .get_object_range(&full_key, start, Some(end))
            .await
            .map_err(|e| {
                let err_str = e.to_string();
                if Self::is_not_found(&err_str) {
                    AppError::NotFound(format!("Storage key not found: {}", key))
                } else {
                    AppError::Storage(format!("Failed to get range of '{}': {}", key, e))
                }
            })?;

        tracing::debug!(key = %key, size = response.bytes().len(), "S3 ranged get successful");
        Ok(Bytes::from(response.to_vec()))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let full_key = self.full_key(key);

        self.bucket
            .delete_object(&full_key)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete object '{}': {}", key, e)))?;

        tracing::debug!(key = %key, "S3 delete object successful");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_full_key_with_prefix() {
        let prefix = Some("resources".to_string());
        let key = "3f8a2c1d-0000-4000-8000-000000000000";

        let full = match &prefix {
            Some(p) => format!("{}/{}", p.trim_end_matches('/'), key),
            None => key.to_string(),
        };

        assert_eq!(full, "resources/3f8a2c1d-0000-4000-8000-000000000000");
    }

    #[test]
    fn test_full_key_without_prefix() {
        let prefix: Option<String> = None;
        let key = "some-key";

        let full = match &prefix {
            Some(p) => format!("{}/{}", p.trim_end_matches('/'), key),
            None => key.to_string(),
        };

        assert_eq!(full, "some-key");
    }

    #[test]
    fn test_not_found_detection() {
        assert!(super::S3Store::is_not_found("HTTP 404: NoSuchKey"));
        assert!(super::S3Store::is_not_found("Not Found"));
        assert!(!super::S3Store::is_not_found("access denied"));
    }
}
