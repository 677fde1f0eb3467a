//! Durable background job queue.
//!
//! Jobs are typed payloads with at-least-once delivery and optional delay.
//! Enqueuers fire and forget; completion and failure are observed only via
//! logging. Handlers must tolerate duplicate delivery.

pub mod handlers;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// A queued unit of work. One variant per job kind; dispatch matches
/// exhaustively so an unhandled kind is a compile error, not a runtime
/// default case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Job {
    /// Sniff a freshly uploaded resource's content type and approve or
    /// escalate it.
    AutoReview { resource_id: i64 },
    /// Tell the moderators a resource needs human review (stub).
    NotifyAdminReview { resource_id: i64 },
    /// Tell the moderators a resource was reported (stub).
    NotifyAdminReport { resource_id: i64 },
    /// Delete a resource row that never finished uploading.
    UnuploadDataRemoval { resource_id: i64 },
}

impl Job {
    /// Stable kind label, used for queue table bookkeeping and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Job::AutoReview { .. } => "auto_review",
            Job::NotifyAdminReview { .. } => "notify_admin_review",
            Job::NotifyAdminReport { .. } => "notify_admin_report",
            Job::UnuploadDataRemoval { .. } => "unupload_data_removal",
        }
    }
}

/// At-least-once delayed task scheduler consumed by the upload pipeline.
///
/// Injected rather than global so tests can substitute a recording or
/// synchronous fake.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queue a job, optionally delayed. Returns as soon as the job is
    /// persisted; execution is observed only through logs.
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<()>;
}
