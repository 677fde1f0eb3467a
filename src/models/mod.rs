//! Database models (SQLx).

pub mod course;
pub mod resource;
pub mod review;

pub use course::Course;
pub use resource::{NewResource, Resource, ResourceState};
pub use review::{NewReviewRecord, ReviewRecord};
