//! Resource model and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Lifecycle state of an uploaded resource.
///
/// `Uploading` rows older than the cleanup grace period are reclaimed by
/// the orphan cleanup job. Only `Approved` resources are downloadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "resource_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Uploading,
    Pending,
    Approved,
    Rejected,
    DmcaTakedown,
}

impl ResourceState {
    /// Whether a reviewer may move a resource from `self` to `to`.
    ///
    /// `uploading -> pending` is not listed: only upload finalize performs
    /// it, after the object actually exists in storage. `DmcaTakedown` is
    /// reachable from any post-upload state, admin only, and is terminal.
    pub fn can_transition(self, to: ResourceState, is_admin: bool) -> bool {
        use ResourceState::*;
        match (self, to) {
            (Pending, Approved) | (Pending, Rejected) => true,
            (Pending | Approved | Rejected, DmcaTakedown) => is_admin,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceState::Uploading => "uploading",
            ResourceState::Pending => "pending",
            ResourceState::Approved => "approved",
            ResourceState::Rejected => "rejected",
            ResourceState::DmcaTakedown => "dmca_takedown",
        }
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource entity
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Resource {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub course_id: Option<i64>,
    pub category: String,
    /// Server-generated object storage key (opaque, never the user filename)
    pub storage_key: String,
    /// User-facing filename, used for download content disposition
    pub filename: String,
    pub uploaded_by: String,
    pub state: ResourceState,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// Only approved resources are visible and downloadable.
    pub fn is_downloadable(&self) -> bool {
        self.state == ResourceState::Approved
    }
}

/// Draft data for a new resource row, inserted at upload begin.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub course_id: Option<i64>,
    pub category: String,
    pub storage_key: String,
    pub filename: String,
    pub uploaded_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_transitions() {
        use ResourceState::*;
        assert!(Pending.can_transition(Approved, false));
        assert!(Pending.can_transition(Rejected, false));
    }

    #[test]
    fn test_reviewers_cannot_shortcut_the_upload() {
        use ResourceState::*;
        // Entering moderation is the pipeline's move, never a reviewer's
        assert!(!Uploading.can_transition(Pending, false));
        assert!(!Uploading.can_transition(Pending, true));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        use ResourceState::*;
        assert!(!Pending.can_transition(Uploading, true));
        assert!(!Approved.can_transition(Pending, true));
        assert!(!Rejected.can_transition(Approved, true));
        assert!(!Approved.can_transition(Rejected, true));
    }

    #[test]
    fn test_dmca_requires_admin() {
        use ResourceState::*;
        assert!(!Pending.can_transition(DmcaTakedown, false));
        assert!(Pending.can_transition(DmcaTakedown, true));
        assert!(Approved.can_transition(DmcaTakedown, true));
        assert!(Rejected.can_transition(DmcaTakedown, true));
        // Not reachable mid-upload
        assert!(!Uploading.can_transition(DmcaTakedown, true));
    }

    #[test]
    fn test_dmca_is_terminal() {
        use ResourceState::*;
        for to in [Uploading, Pending, Approved, Rejected] {
            assert!(!DmcaTakedown.can_transition(to, true));
        }
    }

    #[test]
    fn test_only_approved_is_downloadable() {
        let mut resource = Resource {
            id: 1,
            name: "Midterm Notes".into(),
            description: None,
            tags: vec![],
            course_id: None,
            category: "note".into(),
            storage_key: "k-1".into(),
            filename: "notes.pdf".into(),
            uploaded_by: "u1".into(),
            state: ResourceState::Pending,
            created_at: Utc::now(),
        };
        assert!(!resource.is_downloadable());
        resource.state = ResourceState::Approved;
        assert!(resource.is_downloadable());
        resource.state = ResourceState::DmcaTakedown;
        assert!(!resource.is_downloadable());
    }
}
