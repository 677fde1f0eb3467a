//! Review trail model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::resource::ResourceState;

/// Reason codes for review trail entries written by the pipeline itself.
/// Human moderators supply their own free-text reason codes.
pub mod reason {
    /// Upload finalized, resource entered moderation.
    pub const UPLOADED: &str = "state.uploaded";
    /// Auto review classified the content as safe.
    pub const AUTOREVIEW_APPROVED: &str = "state.autoreview.approved";
    /// Auto review escalated the content to a human.
    pub const AUTOREVIEW_ADMINREVIEW: &str = "state.autoreview.adminreview";
}

/// Append-only audit trail entry for a resource's review history.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ReviewRecord {
    pub id: i64,
    pub resource_id: i64,
    /// None for automatic decisions
    pub reviewer: Option<String>,
    pub reason: String,
    pub state: ResourceState,
    pub created_at: DateTime<Utc>,
}

/// Data for a new review trail entry.
#[derive(Debug, Clone)]
pub struct NewReviewRecord {
    pub resource_id: i64,
    pub reviewer: Option<String>,
    pub reason: String,
    pub state: ResourceState,
}

impl NewReviewRecord {
    /// Trail entry for an automatic (pipeline) decision.
    pub fn automatic(resource_id: i64, reason: &str, state: ResourceState) -> Self {
        Self {
            resource_id,
            reviewer: None,
            reason: reason.to_string(),
            state,
        }
    }
}
