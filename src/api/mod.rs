//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::queue::JobQueue;
use crate::services::auth_service::AuthService;
use crate::services::handoff_token::TokenSigner;
use crate::services::upload_service::UploadService;
use crate::storage::ObjectStore;
use crate::store::ResourceStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ResourceStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn JobQueue>,
    pub upload_service: Arc<UploadService>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ResourceStore>,
        objects: Arc<dyn ObjectStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let upload_service = Arc::new(UploadService::new(
            store.clone(),
            objects.clone(),
            queue.clone(),
            TokenSigner::new(&config.upload_token_secret),
            Duration::from_secs(config.presign_expiry_secs),
            Duration::from_secs(config.cleanup_grace_secs),
        ));
        let auth_service = Arc::new(AuthService::new(&config.jwt_secret));
        Self {
            config,
            store,
            objects,
            queue,
            upload_service,
            auth_service,
        }
    }
}

pub type SharedState = Arc<AppState>;
