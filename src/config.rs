//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Log level
    pub log_level: String,

    /// S3 bucket name
    pub s3_bucket: String,

    /// S3 region
    pub s3_region: String,

    /// S3 endpoint URL (for MinIO or other S3-compatible services)
    pub s3_endpoint: Option<String>,

    /// S3 access key (optional if using instance roles)
    pub s3_access_key: Option<String>,

    /// S3 secret key (optional if using instance roles)
    pub s3_secret_key: Option<String>,

    /// Optional key prefix for all stored objects
    pub s3_prefix: Option<String>,

    /// Presigned URL expiry in seconds
    pub presign_expiry_secs: u64,

    /// JWT secret key for session tokens
    pub jwt_secret: String,

    /// Server secret for signing upload handoff tokens
    pub upload_token_secret: String,

    /// Grace period before an unfinished upload is reclaimed, in seconds
    pub cleanup_grace_secs: u64,

    /// Job queue poll interval in seconds
    pub queue_poll_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            s3_bucket: env::var("S3_BUCKET")
                .map_err(|_| AppError::Config("S3_BUCKET not set".into()))?,
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "auto".into()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_access_key: env::var("S3_ACCESS_KEY_ID").ok(),
            s3_secret_key: env::var("S3_SECRET_ACCESS_KEY").ok(),
            s3_prefix: env::var("S3_PREFIX").ok(),
            presign_expiry_secs: env::var("S3_PRESIGN_EXPIRY_SECS")
                .unwrap_or_else(|_| "3600".into())
                .parse()
                .unwrap_or(3600),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::Config("JWT_SECRET not set".into()))?,
            upload_token_secret: env::var("UPLOAD_TOKEN_SECRET")
                .map_err(|_| AppError::Config("UPLOAD_TOKEN_SECRET not set".into()))?,
            cleanup_grace_secs: env::var("CLEANUP_GRACE_SECS")
                .unwrap_or_else(|_| "86400".into())
                .parse()
                .unwrap_or(86400),
            queue_poll_interval_secs: env::var("QUEUE_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .unwrap_or(5),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_with_defaults() {
        env::set_var("DATABASE_URL", "postgres://localhost/campushare_test");
        env::set_var("S3_BUCKET", "campushare-test");
        env::set_var("JWT_SECRET", "jwt-test");
        env::set_var("UPLOAD_TOKEN_SECRET", "upload-test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.presign_expiry_secs, 3600);
        assert_eq!(config.cleanup_grace_secs, 86400);
        assert_eq!(config.queue_poll_interval_secs, 5);
        assert_eq!(config.s3_bucket, "campushare-test");
    }
}
