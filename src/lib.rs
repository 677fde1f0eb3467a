//! CampuShare - Backend Library
//!
//! Course resource sharing backend. The interesting part is the chunked
//! upload pipeline: clients stage files to object storage in presigned
//! parts, a signed handoff token keeps the session stateless, and a
//! durable job queue drives auto review and orphan cleanup.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;
pub mod services;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
