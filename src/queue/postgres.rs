//! Postgres-backed job queue and worker.
//!
//! Jobs live in the `jobs` table. Workers poll on an interval and claim
//! one ready job at a time with `FOR UPDATE SKIP LOCKED`, so any number of
//! workers can share a queue without double-claiming. Delivery is
//! at-least-once: a worker that dies mid-job leaves the row in `running`
//! and an operator requeues it.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::handlers::{dispatch, JobContext};
use super::{Job, JobQueue};
use crate::error::Result;

const MAX_ATTEMPTS: i32 = 3;
const RETRY_BACKOFF_SECS: i64 = 30;

/// [`JobQueue`] writing to the `jobs` table.
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: Job, delay: Option<Duration>) -> Result<()> {
        let run_at: DateTime<Utc> = match delay {
            Some(delay) => {
                Utc::now() + ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::zero())
            }
            None => Utc::now(),
        };
        let payload = serde_json::to_value(&job)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (kind, payload, status, run_at)
            VALUES ($1, $2, 'queued', $3)
            "#,
        )
        .bind(job.kind())
        .bind(&payload["payload"])
        .bind(run_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(kind = job.kind(), %run_at, "Job enqueued");
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ClaimedJob {
    id: i64,
    kind: String,
    payload: serde_json::Value,
    attempts: i32,
}

/// Polling worker draining the `jobs` table.
pub struct JobWorker {
    pool: PgPool,
    ctx: JobContext,
    poll_interval: Duration,
}

impl JobWorker {
    pub fn new(pool: PgPool, ctx: JobContext, poll_interval: Duration) -> Self {
        Self {
            pool,
            ctx,
            poll_interval,
        }
    }

    /// Spawn the polling loop. Runs until the process exits.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.poll_interval.as_secs(),
                "Job worker started"
            );
            let mut ticker = tokio::time::interval(self.poll_interval);
            loop {
                ticker.tick().await;
                // Drain everything that is ready before sleeping again
                loop {
                    match self.run_one().await {
                        Ok(true) => continue,
                        Ok(false) => break,
                        Err(e) => {
                            tracing::error!("Job worker poll failed: {}", e);
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Claim and run at most one ready job. Returns whether one was found.
    async fn run_one(&self) -> Result<bool> {
        let claimed = sqlx::query_as::<_, ClaimedJob>(
            r#"
            UPDATE jobs
            SET status = 'running', started_at = NOW(), attempts = attempts + 1
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'queued' AND run_at <= NOW()
                ORDER BY run_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, kind, payload, attempts
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(claimed) = claimed else {
            return Ok(false);
        };

        let decoded: std::result::Result<Job, _> = serde_json::from_value(serde_json::json!({
            "kind": claimed.kind,
            "payload": claimed.payload,
        }));

        let job = match decoded {
            Ok(job) => job,
            Err(e) => {
                // Retrying cannot help a payload that does not parse
                tracing::warn!(
                    job_id = claimed.id,
                    kind = %claimed.kind,
                    "Discarding undecodable job payload: {}",
                    e
                );
                self.mark_failed(claimed.id).await?;
                return Ok(true);
            }
        };

        match dispatch(&self.ctx, job).await {
            Ok(()) => {
                sqlx::query(
                    "UPDATE jobs SET status = 'done', finished_at = NOW() WHERE id = $1",
                )
                .bind(claimed.id)
                .execute(&self.pool)
                .await?;
                tracing::info!(job_id = claimed.id, kind = %claimed.kind, "Job completed");
            }
            Err(e) if claimed.attempts < MAX_ATTEMPTS => {
                let retry_at = Utc::now()
                    + ChronoDuration::seconds(RETRY_BACKOFF_SECS * i64::from(claimed.attempts));
                sqlx::query("UPDATE jobs SET status = 'queued', run_at = $1 WHERE id = $2")
                    .bind(retry_at)
                    .bind(claimed.id)
                    .execute(&self.pool)
                    .await?;
                tracing::warn!(
                    job_id = claimed.id,
                    kind = %claimed.kind,
                    attempt = claimed.attempts,
                    "Job failed, retrying: {}",
                    e
                );
            }
            Err(e) => {
                self.mark_failed(claimed.id).await?;
                tracing::error!(
                    job_id = claimed.id,
                    kind = %claimed.kind,
                    "Job failed permanently: {}",
                    e
                );
            }
        }
        Ok(true)
    }

    async fn mark_failed(&self, job_id: i64) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'failed', finished_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
