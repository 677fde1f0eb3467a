//! Recording job queue for tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::{Job, JobQueue};
use crate::error::Result;

/// [`JobQueue`] that records enqueued jobs instead of running them. Tests
/// drain it and either assert on its contents or feed the jobs to a
/// dispatcher by hand.
#[derive(Default)]
pub struct InMemoryJobQueue {
    jobs: Mutex<Vec<(Job, Option<Duration>)>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything enqueued so far, in order.
    pub fn enqueued(&self) -> Vec<(Job, Option<Duration>)> {
        self.jobs.lock().expect("queue lock poisoned").clone()
    }

    /// Take all enqueued jobs, leaving the queue empty.
    pub fn drain(&self) -> Vec<(Job, Option<Duration>)> {
        std::mem::take(&mut *self.jobs.lock().expect("queue lock poisoned"))
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<()> {
        self.jobs
            .lock()
            .expect("queue lock poisoned")
            .push((job, delay));
        Ok(())
    }
}
