//! Resource detail, download, moderation and reporting endpoints.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::api::dto::{DownloadResponse, ReviewRequest};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::{NewReviewRecord, Resource, ReviewRecord};
use crate::queue::Job;
use crate::services::auth_service::Permission;

/// Resource detail plus object metadata, when the object is in storage.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ResourceDetail {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Fetch one resource by id.
#[utoipa::path(
    get,
    path = "/api/v1/resources/{id}",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource detail", body = ResourceDetail),
        (status = 404, description = "Unknown resource"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_resource(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<ResourceDetail>> {
    let resource = state
        .store
        .fetch_resource(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))?;

    // Size and checksum are absent while the upload is still in flight
    let head = match state.objects.head_object(&resource.storage_key).await {
        Ok(head) => Some(head),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };

    Ok(Json(ResourceDetail {
        resource,
        size: head.as_ref().map(|h| h.size),
        checksum: head.and_then(|h| h.checksum),
    }))
}

/// Mint a presigned download URL. Approved resources only; the URL carries
/// a content disposition restoring the original filename.
#[utoipa::path(
    get,
    path = "/api/v1/resources/{id}/download",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Presigned download link", body = DownloadResponse),
        (status = 403, description = "Resource is not approved"),
        (status = 404, description = "Unknown resource"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_resource(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<DownloadResponse>> {
    let resource = state
        .store
        .fetch_resource(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))?;

    if !resource.is_downloadable() {
        return Err(AppError::Forbidden(
            "Resource has not been approved for download".into(),
        ));
    }

    let url = state
        .objects
        .presign_download_url(
            &resource.storage_key,
            &resource.filename,
            Duration::from_secs(state.config.presign_expiry_secs),
        )
        .await?;
    Ok(Json(DownloadResponse {
        url,
        filename: resource.filename,
    }))
}

/// Moderator decision on a resource.
///
/// The transition is guarded against the state the moderator saw: if the
/// row moved meanwhile (another moderator, or auto review), the request
/// fails with a conflict instead of clobbering the earlier decision.
#[utoipa::path(
    post,
    path = "/api/v1/resources/{id}/review",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = ReviewRecord),
        (status = 403, description = "Caller may not perform this transition"),
        (status = 404, description = "Unknown resource"),
        (status = 409, description = "Resource state changed concurrently"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn review_resource(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i64>,
    Json(review): Json<ReviewRequest>,
) -> Result<Json<ReviewRecord>> {
    if auth.permission < Permission::Moderator {
        return Err(AppError::Forbidden("Moderator access required".into()));
    }
    let is_admin = auth.permission >= Permission::Admin;

    let resource = state
        .store
        .fetch_resource(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))?;

    if !resource.state.can_transition(review.state, is_admin) {
        return Err(AppError::Forbidden(format!(
            "Transition {} -> {} is not allowed",
            resource.state, review.state
        )));
    }

    let moved = state
        .store
        .transition_state(id, resource.state, review.state)
        .await?;
    if !moved {
        return Err(AppError::Conflict(format!(
            "Resource {} changed state during review",
            id
        )));
    }

    let record = state
        .store
        .insert_review(NewReviewRecord {
            resource_id: id,
            reviewer: Some(auth.user_id),
            reason: review.reason.unwrap_or_else(|| "state.review".to_string()),
            state: review.state,
        })
        .await?;

    tracing::info!(
        resource_id = id,
        state = %review.state,
        reviewer = %record.reviewer.as_deref().unwrap_or("?"),
        "Resource reviewed"
    );
    Ok(Json(record))
}

/// Report a resource to the moderators.
#[utoipa::path(
    post,
    path = "/api/v1/resources/{id}/report",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 202, description = "Report queued"),
        (status = 404, description = "Unknown resource"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn report_resource(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<axum::http::StatusCode> {
    if state.store.fetch_resource(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Resource {} not found", id)));
    }
    state
        .queue
        .enqueue(Job::NotifyAdminReport { resource_id: id }, None)
        .await?;
    Ok(axum::http::StatusCode::ACCEPTED)
}

/// Review trail for a resource, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/resources/{id}/reviews",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Review trail", body = [ReviewRecord]),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_reviews(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ReviewRecord>>> {
    if auth.permission < Permission::Moderator {
        return Err(AppError::Forbidden("Moderator access required".into()));
    }
    Ok(Json(state.store.list_reviews(id).await?))
}
