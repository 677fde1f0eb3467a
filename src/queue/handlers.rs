//! Job handlers.
//!
//! Every handler is idempotent against duplicate delivery and tolerant of
//! rows that disappeared between enqueue and execution.

use std::sync::Arc;

use super::{Job, JobQueue};
use crate::error::Result;
use crate::models::{review::reason, NewReviewRecord, ResourceState};
use crate::services::review::{detect_mime, is_mime_safe, SNIFF_LEN};
use crate::storage::ObjectStore;
use crate::store::ResourceStore;

/// Shared dependencies handed to every job handler.
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn ResourceStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn JobQueue>,
}

/// Run one job to completion. Exhaustive over job kinds.
pub async fn dispatch(ctx: &JobContext, job: Job) -> Result<()> {
    match job {
        Job::AutoReview { resource_id } => auto_review(ctx, resource_id).await,
        Job::NotifyAdminReview { resource_id } => {
            // Notification channel not wired up yet; the review queue itself
            // is visible to moderators through the pending state.
            tracing::info!(resource_id, "Resource escalated for moderator review");
            Ok(())
        }
        Job::NotifyAdminReport { resource_id } => {
            tracing::info!(resource_id, "Resource reported by a user");
            Ok(())
        }
        Job::UnuploadDataRemoval { resource_id } => remove_unuploaded(ctx, resource_id).await,
    }
}

/// Sniff the leading bytes of a freshly uploaded object and either
/// auto-approve it or leave it pending for a moderator.
async fn auto_review(ctx: &JobContext, resource_id: i64) -> Result<()> {
    let Some(resource) = ctx.store.fetch_resource(resource_id).await? else {
        tracing::info!(resource_id, "Auto review skipped, resource is gone");
        return Ok(());
    };
    if resource.state != ResourceState::Pending {
        tracing::info!(
            resource_id,
            state = %resource.state,
            "Auto review skipped, resource already left pending"
        );
        return Ok(());
    }

    let head = ctx
        .objects
        .get_object_range(&resource.storage_key, 0, SNIFF_LEN - 1)
        .await?;
    let mime = detect_mime(&head).unwrap_or("");

    if is_mime_safe(mime) {
        let (moved, _) = tokio::try_join!(
            ctx.store.transition_state(
                resource_id,
                ResourceState::Pending,
                ResourceState::Approved,
            ),
            ctx.store.insert_review(NewReviewRecord::automatic(
                resource_id,
                reason::AUTOREVIEW_APPROVED,
                ResourceState::Approved,
            )),
        )?;
        if moved {
            tracing::info!(resource_id, mime, "Resource auto-approved");
        } else {
            // A moderator got there first; their decision stands.
            tracing::info!(resource_id, "Auto approval lost the state guard");
        }
    } else {
        ctx.store
            .insert_review(NewReviewRecord::automatic(
                resource_id,
                reason::AUTOREVIEW_ADMINREVIEW,
                ResourceState::Pending,
            ))
            .await?;
        ctx.queue
            .enqueue(Job::NotifyAdminReview { resource_id }, None)
            .await?;
        tracing::info!(resource_id, mime, "Resource escalated to moderators");
    }
    Ok(())
}

/// Delete a resource row whose upload never finished. A finished upload
/// has left the uploading state, so the row survives.
async fn remove_unuploaded(ctx: &JobContext, resource_id: i64) -> Result<()> {
    let Some(resource) = ctx.store.fetch_resource(resource_id).await? else {
        return Ok(());
    };
    if resource.state != ResourceState::Uploading {
        tracing::debug!(resource_id, "Cleanup skipped, upload completed");
        return Ok(());
    }

    ctx.store.delete_resource(resource_id).await?;
    tracing::info!(resource_id, "Removed abandoned upload");
    Ok(())
}
