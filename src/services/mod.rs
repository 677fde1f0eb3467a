//! Business logic services.

pub mod auth_service;
pub mod handoff_token;
pub mod review;
pub mod upload_service;
