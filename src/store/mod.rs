//! Relational data access for resources, courses, and the review trail.
//!
//! The upload pipeline consumes this as a capability so the whole flow can
//! run against an in-memory store in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewResource, NewReviewRecord, Resource, ResourceState, ReviewRecord};

/// Row-level access to the resource tables.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Create a course row, returning its id.
    async fn create_course(&self, name: &str, teacher: Option<&str>) -> Result<i64>;

    /// Insert a resource row in `Uploading` state.
    async fn insert_resource(&self, new: NewResource) -> Result<Resource>;

    /// Fetch a resource by id.
    async fn fetch_resource(&self, id: i64) -> Result<Option<Resource>>;

    /// Guarded state transition: updates the row only while its current
    /// state is `from`. Returns whether a row was updated, so a concurrent
    /// decision (say a moderator beating the auto reviewer) loses nothing.
    async fn transition_state(
        &self,
        id: i64,
        from: ResourceState,
        to: ResourceState,
    ) -> Result<bool>;

    /// Delete a resource row. Returns whether a row existed.
    async fn delete_resource(&self, id: i64) -> Result<bool>;

    /// Append a review trail entry.
    async fn insert_review(&self, review: NewReviewRecord) -> Result<ReviewRecord>;

    /// Review trail for a resource, oldest first.
    async fn list_reviews(&self, resource_id: i64) -> Result<Vec<ReviewRecord>>;
}
