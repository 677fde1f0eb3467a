//! PostgreSQL implementation of the resource store.

use async_trait::async_trait;
use sqlx::PgPool;

use super::ResourceStore;
use crate::error::Result;
use crate::models::{NewResource, NewReviewRecord, Resource, ResourceState, ReviewRecord};

/// SQLx-backed resource store.
#[derive(Clone)]
pub struct PgResourceStore {
    pool: PgPool,
}

impl PgResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    async fn create_course(&self, name: &str, teacher: Option<&str>) -> Result<i64> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO courses (name, teacher) VALUES ($1, $2) RETURNING id")
                .bind(name)
                .bind(teacher)
                .fetch_one(&self.pool)
                .await?;

        tracing::debug!(course_id = id, name = %name, "Course created");
        Ok(id)
    }

    async fn insert_resource(&self, new: NewResource) -> Result<Resource> {
        let resource = sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources
                (name, description, tags, course_id, category, storage_key, filename, uploaded_by, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'uploading')
            RETURNING id, name, description, tags, course_id, category,
                      storage_key, filename, uploaded_by, state, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.tags)
        .bind(new.course_id)
        .bind(&new.category)
        .bind(&new.storage_key)
        .bind(&new.filename)
        .bind(&new.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(resource_id = resource.id, "Resource row created");
        Ok(resource)
    }

    async fn fetch_resource(&self, id: i64) -> Result<Option<Resource>> {
        let resource = sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, name, description, tags, course_id, category,
                   storage_key, filename, uploaded_by, state, created_at
            FROM resources
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(resource)
    }

    async fn transition_state(
        &self,
        id: i64,
        from: ResourceState,
        to: ResourceState,
    ) -> Result<bool> {
        // Single conditional update; a lost race leaves the row untouched.
        let result = sqlx::query("UPDATE resources SET state = $1 WHERE id = $2 AND state = $3")
            .bind(to)
            .bind(id)
            .bind(from)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_resource(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_review(&self, review: NewReviewRecord) -> Result<ReviewRecord> {
        let record = sqlx::query_as::<_, ReviewRecord>(
            r#"
            INSERT INTO review_records (resource_id, reviewer, reason, state)
            VALUES ($1, $2, $3, $4)
            RETURNING id, resource_id, reviewer, reason, state, created_at
            "#,
        )
        .bind(review.resource_id)
        .bind(&review.reviewer)
        .bind(&review.reason)
        .bind(review.state)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_reviews(&self, resource_id: i64) -> Result<Vec<ReviewRecord>> {
        let records = sqlx::query_as::<_, ReviewRecord>(
            r#"
            SELECT id, resource_id, reviewer, reason, state, created_at
            FROM review_records
            WHERE resource_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
