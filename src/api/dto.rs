//! Request and response bodies for the client action endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::CompletedPart;

/// Course reference in an upload draft. A negative `id` asks the server to
/// create the course with the given name and teacher first.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseSelectionDto {
    pub id: i64,
    pub name: String,
    pub teacher: Option<String>,
}

/// The client-driven upload protocol. One endpoint, one tagged union, so
/// an unknown action is a deserialization error rather than a silent
/// fallthrough.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    /// Phase one: create the resource row and the multipart session.
    BeginUpload {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        course: Option<CourseSelectionDto>,
        category: String,
        filename: String,
        #[serde(default)]
        file_size: Option<u64>,
    },
    /// Phase two, repeated per chunk: mint a presigned part URL.
    RequestPartUrl {
        resource_id: i64,
        upload_id: String,
        storage_key: String,
        token: String,
        part_number: u32,
    },
    /// Phase three: merge the parts and enter moderation.
    FinalizeUpload {
        resource_id: i64,
        upload_id: String,
        storage_key: String,
        token: String,
        parts: Vec<CompletedPart>,
    },
}

/// Server's answer to a [`ClientAction`].
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ServerAction {
    UploadStarted {
        resource_id: i64,
        upload_id: String,
        storage_key: String,
        token: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        chunk_count: Option<u64>,
    },
    PartUrl {
        url: String,
    },
    UploadFinalized {
        resource_id: i64,
    },
}

/// Moderator decision on a pending resource.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub state: crate::models::ResourceState,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Presigned download link.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DownloadResponse {
    pub url: String,
    pub filename: String,
}
