//! OpenAPI specification generated from handler annotations via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::dto::{
    ClientAction, CourseSelectionDto, DownloadResponse, ReviewRequest, ServerAction,
};
use crate::api::handlers::resources::ResourceDetail;
use crate::models::{Resource, ResourceState, ReviewRecord};
use crate::storage::CompletedPart;

/// Top-level OpenAPI document for the CampuShare backend.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CampuShare API",
        description = "Course resource sharing backend with a chunked upload pipeline.",
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    modifiers(&SecurityAddon),
    paths(
        crate::api::handlers::uploads::client_action,
        crate::api::handlers::resources::get_resource,
        crate::api::handlers::resources::download_resource,
        crate::api::handlers::resources::review_resource,
        crate::api::handlers::resources::report_resource,
        crate::api::handlers::resources::list_reviews,
    ),
    tags(
        (name = "uploads", description = "Client-driven chunked upload protocol"),
        (name = "resources", description = "Resource access and moderation"),
    ),
    components(schemas(
        ClientAction,
        ServerAction,
        CourseSelectionDto,
        ReviewRequest,
        DownloadResponse,
        CompletedPart,
        Resource,
        ResourceDetail,
        ResourceState,
        ReviewRecord,
        ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Standard error response body returned by all endpoints on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "NOT_FOUND", "VALIDATION_ERROR")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// Adds Bearer JWT security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
