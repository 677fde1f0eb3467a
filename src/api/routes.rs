//! Route definitions for the API.

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers;
use super::middleware::auth::auth_middleware;
use super::openapi::ApiDoc;
use super::SharedState;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // Health endpoint (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // API v1 routes
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API v1 routes, all behind session auth
fn api_v1_routes(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/uploads/action", post(handlers::uploads::client_action))
        .route("/resources/:id", get(handlers::resources::get_resource))
        .route(
            "/resources/:id/download",
            get(handlers::resources::download_resource),
        )
        .route(
            "/resources/:id/review",
            post(handlers::resources::review_resource),
        )
        .route(
            "/resources/:id/report",
            post(handlers::resources::report_resource),
        )
        .route(
            "/resources/:id/reviews",
            get(handlers::resources::list_reviews),
        )
        .layer(middleware::from_fn_with_state(
            state.auth_service.clone(),
            auth_middleware,
        ))
}
