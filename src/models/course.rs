//! Course model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Course entity
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub teacher: Option<String>,
    pub created_at: DateTime<Utc>,
}
