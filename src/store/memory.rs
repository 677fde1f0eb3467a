//! In-memory implementation of the resource store for tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use super::ResourceStore;
use crate::error::Result;
use crate::models::{Course, NewResource, NewReviewRecord, Resource, ResourceState, ReviewRecord};

#[derive(Default)]
struct Inner {
    courses: HashMap<i64, Course>,
    resources: HashMap<i64, Resource>,
    reviews: Vec<ReviewRecord>,
    next_course_id: i64,
    next_resource_id: i64,
    next_review_id: i64,
}

/// HashMap-backed [`ResourceStore`].
#[derive(Default)]
pub struct InMemoryResourceStore {
    inner: Mutex<Inner>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct state override for test setup, bypassing transition guards.
    pub fn set_state(&self, id: i64, state: ResourceState) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if let Some(resource) = inner.resources.get_mut(&id) {
            resource.state = state;
        }
    }

    pub fn course(&self, id: i64) -> Option<Course> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.courses.get(&id).cloned()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn create_course(&self, name: &str, teacher: Option<&str>) -> Result<i64> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_course_id += 1;
        let id = inner.next_course_id;
        inner.courses.insert(
            id,
            Course {
                id,
                name: name.to_string(),
                teacher: teacher.map(str::to_string),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn insert_resource(&self, new: NewResource) -> Result<Resource> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_resource_id += 1;
        let id = inner.next_resource_id;
        let resource = Resource {
            id,
            name: new.name,
            description: new.description,
            tags: new.tags,
            course_id: new.course_id,
            category: new.category,
            storage_key: new.storage_key,
            filename: new.filename,
            uploaded_by: new.uploaded_by,
            state: ResourceState::Uploading,
            created_at: Utc::now(),
        };
        inner.resources.insert(id, resource.clone());
        Ok(resource)
    }

    async fn fetch_resource(&self, id: i64) -> Result<Option<Resource>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.resources.get(&id).cloned())
    }

    async fn transition_state(
        &self,
        id: i64,
        from: ResourceState,
        to: ResourceState,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner.resources.get_mut(&id) {
            Some(resource) if resource.state == from => {
                resource.state = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_resource(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.resources.remove(&id).is_some())
    }

    async fn insert_review(&self, review: NewReviewRecord) -> Result<ReviewRecord> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_review_id += 1;
        let record = ReviewRecord {
            id: inner.next_review_id,
            resource_id: review.resource_id,
            reviewer: review.reviewer,
            reason: review.reason,
            state: review.state,
            created_at: Utc::now(),
        };
        inner.reviews.push(record.clone());
        Ok(record)
    }

    async fn list_reviews(&self, resource_id: i64) -> Result<Vec<ReviewRecord>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .reviews
            .iter()
            .filter(|r| r.resource_id == resource_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(key: &str) -> NewResource {
        NewResource {
            name: "Lecture Slides".into(),
            description: None,
            tags: vec!["week1".into()],
            course_id: None,
            category: "slides".into(),
            storage_key: key.into(),
            filename: "slides.pdf".into(),
            uploaded_by: "u1".into(),
        }
    }

    #[tokio::test]
    async fn test_insert_starts_in_uploading() {
        let store = InMemoryResourceStore::new();
        let resource = store.insert_resource(draft("k-1")).await.unwrap();
        assert_eq!(resource.state, ResourceState::Uploading);
        assert_eq!(resource.id, 1);
    }

    #[tokio::test]
    async fn test_guarded_transition() {
        let store = InMemoryResourceStore::new();
        let resource = store.insert_resource(draft("k-1")).await.unwrap();

        assert!(store
            .transition_state(resource.id, ResourceState::Uploading, ResourceState::Pending)
            .await
            .unwrap());

        // Second identical transition loses the guard
        assert!(!store
            .transition_state(resource.id, ResourceState::Uploading, ResourceState::Pending)
            .await
            .unwrap());

        let current = store.fetch_resource(resource.id).await.unwrap().unwrap();
        assert_eq!(current.state, ResourceState::Pending);
    }

    #[tokio::test]
    async fn test_delete_missing_resource() {
        let store = InMemoryResourceStore::new();
        assert!(!store.delete_resource(404).await.unwrap());
    }
}
