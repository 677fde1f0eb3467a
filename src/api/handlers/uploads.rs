//! Client action endpoint driving the upload handoff.

use axum::{extract::State, Extension, Json};

use crate::api::dto::{ClientAction, ServerAction};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::auth_service::Permission;
use crate::services::upload_service::{
    CourseSelection, FinalizeRequest, PartUrlRequest, UploadDraft,
};

/// Single entry point for the upload protocol.
///
/// Phase one checks the caller's permission; phases two and three are
/// authorized by the handoff token alone, so a client that lost its
/// session mid-upload can still finish with just the begin response.
#[utoipa::path(
    post,
    path = "/api/v1/uploads/action",
    tag = "uploads",
    request_body = ClientAction,
    responses(
        (status = 200, description = "Action performed", body = ServerAction),
        (status = 400, description = "Malformed action"),
        (status = 403, description = "Permission or token denied"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn client_action(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(action): Json<ClientAction>,
) -> Result<Json<ServerAction>> {
    match action {
        ClientAction::BeginUpload {
            name,
            description,
            tags,
            course,
            category,
            filename,
            file_size,
        } => {
            if auth.permission < Permission::Verified {
                return Err(AppError::Forbidden(
                    "Uploading requires a verified account".into(),
                ));
            }
            if name.trim().is_empty() || filename.trim().is_empty() {
                return Err(AppError::Validation("Name and filename are required".into()));
            }

            let draft = UploadDraft {
                name,
                description,
                tags,
                course: course.map(|c| CourseSelection {
                    id: c.id,
                    name: c.name,
                    teacher: c.teacher,
                }),
                category,
                filename,
                file_size,
            };
            let ticket = state.upload_service.begin(draft, &auth.user_id).await?;
            Ok(Json(ServerAction::UploadStarted {
                resource_id: ticket.resource_id,
                upload_id: ticket.upload_id,
                storage_key: ticket.storage_key,
                token: ticket.token,
                chunk_count: ticket.chunk_count,
            }))
        }

        ClientAction::RequestPartUrl {
            resource_id,
            upload_id,
            storage_key,
            token,
            part_number,
        } => {
            let url = state
                .upload_service
                .request_part_url(&PartUrlRequest {
                    resource_id,
                    upload_id,
                    storage_key,
                    token,
                    part_number,
                })
                .await?
                .ok_or_else(|| AppError::Forbidden("Invalid upload token".into()))?;
            Ok(Json(ServerAction::PartUrl { url }))
        }

        ClientAction::FinalizeUpload {
            resource_id,
            upload_id,
            storage_key,
            token,
            parts,
        } => {
            if parts.is_empty() {
                return Err(AppError::Validation("At least one part is required".into()));
            }
            state
                .upload_service
                .finalize(&FinalizeRequest {
                    resource_id,
                    upload_id,
                    storage_key,
                    token,
                    parts,
                })
                .await?
                .ok_or_else(|| AppError::Forbidden("Invalid upload token".into()))?;
            Ok(Json(ServerAction::UploadFinalized { resource_id }))
        }
    }
}
