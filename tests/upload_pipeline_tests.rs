//! End-to-end tests for the chunked upload pipeline.
//!
//! The whole flow runs hermetically against in-memory store, object
//! storage, and job queue implementations. Queued jobs are executed by
//! feeding them to the dispatcher by hand, standing in for the worker.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use campushare_backend::api::{routes::create_router, AppState, SharedState};
use campushare_backend::config::Config;
use campushare_backend::models::ResourceState;
use campushare_backend::queue::handlers::{dispatch, JobContext};
use campushare_backend::queue::memory::InMemoryJobQueue;
use campushare_backend::queue::Job;
use campushare_backend::services::auth_service::Permission;
use campushare_backend::storage::memory::InMemoryObjectStore;
use campushare_backend::store::memory::InMemoryResourceStore;
use campushare_backend::store::ResourceStore;

struct TestApp {
    state: SharedState,
    store: Arc<InMemoryResourceStore>,
    objects: Arc<InMemoryObjectStore>,
    queue: Arc<InMemoryJobQueue>,
}

fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        bind_address: "127.0.0.1:0".into(),
        log_level: "debug".into(),
        s3_bucket: "test-bucket".into(),
        s3_region: "auto".into(),
        s3_endpoint: None,
        s3_access_key: None,
        s3_secret_key: None,
        s3_prefix: None,
        presign_expiry_secs: 3600,
        jwt_secret: "test-jwt-secret".into(),
        upload_token_secret: "test-upload-secret".into(),
        cleanup_grace_secs: 86400,
        queue_poll_interval_secs: 5,
    }
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryResourceStore::new());
    let objects = Arc::new(InMemoryObjectStore::new());
    let queue = Arc::new(InMemoryJobQueue::new());
    let state = Arc::new(AppState::new(
        test_config(),
        store.clone(),
        objects.clone(),
        queue.clone(),
    ));
    TestApp {
        state,
        store,
        objects,
        queue,
    }
}

impl TestApp {
    fn token(&self, user: &str, permission: Permission) -> String {
        self.state
            .auth_service
            .issue_token(user, permission, Duration::from_secs(3600))
            .unwrap()
    }

    fn job_context(&self) -> JobContext {
        JobContext {
            store: self.store.clone(),
            objects: self.objects.clone(),
            queue: self.queue.clone(),
        }
    }

    async fn request(&self, method: &str, uri: &str, bearer: &str, body: Option<Value>) -> (StatusCode, Value) {
        let app = create_router(self.state.clone());
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn action(&self, bearer: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", "/api/v1/uploads/action", bearer, Some(body))
            .await
    }
}

fn begin_body() -> Value {
    json!({
        "action": "begin_upload",
        "name": "Linear Algebra Midterm Notes",
        "description": "Chapters 1-4",
        "tags": ["midterm", "notes"],
        "category": "note",
        "filename": "midterm-notes.pdf",
        "file_size": 45_000_000u64
    })
}

#[tokio::test]
async fn test_full_upload_and_auto_approval() {
    let app = test_app();
    let token = app.token("student-1", Permission::Verified);

    // Phase one: begin
    let (status, begin) = app.action(&token, begin_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(begin["result"], "upload_started");
    // 45 MB at 20 MiB chunks
    assert_eq!(begin["chunk_count"], 3);

    let resource_id = begin["resource_id"].as_i64().unwrap();
    let storage_key = begin["storage_key"].as_str().unwrap().to_string();

    // Phase two: part URLs, re-requesting one to prove idempotence
    for part in [1, 2, 3, 2] {
        let (status, reply) = app
            .action(
                &token,
                json!({
                    "action": "request_part_url",
                    "resource_id": resource_id,
                    "upload_id": begin["upload_id"],
                    "storage_key": begin["storage_key"],
                    "token": begin["token"],
                    "part_number": part
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["result"], "part_url");
    }

    // Phase three: finalize
    let (status, done) = app
        .action(
            &token,
            json!({
                "action": "finalize_upload",
                "resource_id": resource_id,
                "upload_id": begin["upload_id"],
                "storage_key": begin["storage_key"],
                "token": begin["token"],
                "parts": [
                    { "part_number": 1, "etag": "e1" },
                    { "part_number": 2, "etag": "e2" },
                    { "part_number": 3, "etag": "e3" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["result"], "upload_finalized");

    let resource = app.store.fetch_resource(resource_id).await.unwrap().unwrap();
    assert_eq!(resource.state, ResourceState::Pending);

    // The worker would now pick up the auto review job. Seed PDF content
    // where the client's direct PUTs would have landed.
    app.objects
        .put_object(&storage_key, bytes::Bytes::from_static(b"%PDF-1.7 notes"));

    let jobs = app.queue.drain();
    let ctx = app.job_context();
    for (job, _) in jobs {
        if matches!(job, Job::AutoReview { .. }) {
            dispatch(&ctx, job).await.unwrap();
        }
    }

    let resource = app.store.fetch_resource(resource_id).await.unwrap().unwrap();
    assert_eq!(resource.state, ResourceState::Approved);

    // Approved resources are downloadable with the original filename
    let (status, download) = app
        .request(
            "GET",
            &format!("/api/v1/resources/{}/download", resource_id),
            &token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(download["filename"], "midterm-notes.pdf");
}

#[tokio::test]
async fn test_begin_requires_verified_account() {
    let app = test_app();
    let token = app.token("lurker", Permission::Unverified);

    let (status, body) = app.action(&token, begin_body()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_missing_auth_rejected() {
    let app = test_app();
    let router = create_router(app.state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/uploads/action")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(begin_body().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_finalize_changes_nothing() {
    let app = test_app();
    let token = app.token("student-1", Permission::Verified);

    let (_, begin) = app.action(&token, begin_body()).await;
    let resource_id = begin["resource_id"].as_i64().unwrap();

    let (status, body) = app
        .action(
            &token,
            json!({
                "action": "finalize_upload",
                "resource_id": resource_id,
                "upload_id": begin["upload_id"],
                "storage_key": begin["storage_key"],
                "token": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=00112233445566778899aabbccddeeff",
                "parts": [{ "part_number": 1, "etag": "e1" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let resource = app.store.fetch_resource(resource_id).await.unwrap().unwrap();
    assert_eq!(resource.state, ResourceState::Uploading);
    assert!(app.objects.completed_uploads().is_empty());
}

#[tokio::test]
async fn test_cleanup_reclaims_abandoned_upload_only() {
    let app = test_app();
    let token = app.token("student-1", Permission::Verified);

    // Two uploads begin; only the second finishes
    let (_, abandoned) = app.action(&token, begin_body()).await;
    let (_, finished) = app.action(&token, begin_body()).await;
    let abandoned_id = abandoned["resource_id"].as_i64().unwrap();
    let finished_id = finished["resource_id"].as_i64().unwrap();

    let (status, _) = app
        .action(
            &token,
            json!({
                "action": "finalize_upload",
                "resource_id": finished_id,
                "upload_id": finished["upload_id"],
                "storage_key": finished["storage_key"],
                "token": finished["token"],
                "parts": [{ "part_number": 1, "etag": "e1" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Both begins scheduled a delayed cleanup
    let jobs = app.queue.drain();
    let cleanups: Vec<_> = jobs
        .iter()
        .filter(|(job, _)| matches!(job, Job::UnuploadDataRemoval { .. }))
        .collect();
    assert_eq!(cleanups.len(), 2);
    for (_, delay) in &cleanups {
        assert_eq!(*delay, Some(Duration::from_secs(86400)));
    }

    // Run them as the worker would after the grace period
    let ctx = app.job_context();
    for (job, _) in jobs {
        if matches!(job, Job::UnuploadDataRemoval { .. }) {
            dispatch(&ctx, job).await.unwrap();
        }
    }

    assert!(app.store.fetch_resource(abandoned_id).await.unwrap().is_none());
    let survivor = app.store.fetch_resource(finished_id).await.unwrap().unwrap();
    assert_eq!(survivor.state, ResourceState::Pending);
}

#[tokio::test]
async fn test_unsafe_content_escalates_and_moderator_decides() {
    let app = test_app();
    let student = app.token("student-1", Permission::Verified);
    let moderator = app.token("mod-1", Permission::Moderator);

    let (_, begin) = app.action(&student, begin_body()).await;
    let resource_id = begin["resource_id"].as_i64().unwrap();
    let storage_key = begin["storage_key"].as_str().unwrap().to_string();

    let (status, _) = app
        .action(
            &student,
            json!({
                "action": "finalize_upload",
                "resource_id": resource_id,
                "upload_id": begin["upload_id"],
                "storage_key": begin["storage_key"],
                "token": begin["token"],
                "parts": [{ "part_number": 1, "etag": "e1" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Content with no recognizable magic bytes
    app.objects
        .put_object(&storage_key, bytes::Bytes::from_static(b"\x00\x01\x02 mystery"));

    let ctx = app.job_context();
    for (job, _) in app.queue.drain() {
        if matches!(job, Job::AutoReview { .. }) {
            dispatch(&ctx, job).await.unwrap();
        }
    }

    // Escalated, not approved; moderators were notified
    let resource = app.store.fetch_resource(resource_id).await.unwrap().unwrap();
    assert_eq!(resource.state, ResourceState::Pending);
    assert!(app
        .queue
        .enqueued()
        .iter()
        .any(|(job, _)| matches!(job, Job::NotifyAdminReview { .. })));

    // Download denied while pending
    let (status, _) = app
        .request(
            "GET",
            &format!("/api/v1/resources/{}/download", resource_id),
            &student,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Moderator rejects
    let (status, record) = app
        .request(
            "POST",
            &format!("/api/v1/resources/{}/review", resource_id),
            &moderator,
            Some(json!({ "state": "rejected", "reason": "state.review.copyright" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["reviewer"], "mod-1");

    let resource = app.store.fetch_resource(resource_id).await.unwrap().unwrap();
    assert_eq!(resource.state, ResourceState::Rejected);
}

#[tokio::test]
async fn test_moderator_decision_beats_late_auto_review() {
    let app = test_app();
    let student = app.token("student-1", Permission::Verified);
    let moderator = app.token("mod-1", Permission::Moderator);

    let (_, begin) = app.action(&student, begin_body()).await;
    let resource_id = begin["resource_id"].as_i64().unwrap();
    let storage_key = begin["storage_key"].as_str().unwrap().to_string();

    app.action(
        &student,
        json!({
            "action": "finalize_upload",
            "resource_id": resource_id,
            "upload_id": begin["upload_id"],
            "storage_key": begin["storage_key"],
            "token": begin["token"],
            "parts": [{ "part_number": 1, "etag": "e1" }]
        }),
    )
    .await;
    app.objects
        .put_object(&storage_key, bytes::Bytes::from_static(b"%PDF-1.7"));

    // Moderator rejects before the auto review job runs
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/resources/{}/review", resource_id),
            &moderator,
            Some(json!({ "state": "rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let ctx = app.job_context();
    for (job, _) in app.queue.drain() {
        if matches!(job, Job::AutoReview { .. }) {
            dispatch(&ctx, job).await.unwrap();
        }
    }

    // The late job must not clobber the human decision
    let resource = app.store.fetch_resource(resource_id).await.unwrap().unwrap();
    assert_eq!(resource.state, ResourceState::Rejected);
}

#[tokio::test]
async fn test_moderator_cannot_shortcut_uploading_resource() {
    let app = test_app();
    let student = app.token("student-1", Permission::Verified);
    let moderator = app.token("mod-1", Permission::Moderator);

    let (_, begin) = app.action(&student, begin_body()).await;
    let resource_id = begin["resource_id"].as_i64().unwrap();

    // The object does not exist yet; only finalize may enter moderation
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/resources/{}/review", resource_id),
            &moderator,
            Some(json!({ "state": "pending" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let resource = app.store.fetch_resource(resource_id).await.unwrap().unwrap();
    assert_eq!(resource.state, ResourceState::Uploading);
}

#[tokio::test]
async fn test_dmca_takedown_is_admin_only() {
    let app = test_app();
    let student = app.token("student-1", Permission::Verified);
    let moderator = app.token("mod-1", Permission::Moderator);
    let admin = app.token("admin-1", Permission::Admin);

    let (_, begin) = app.action(&student, begin_body()).await;
    let resource_id = begin["resource_id"].as_i64().unwrap();
    app.store.set_state(resource_id, ResourceState::Approved);

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/resources/{}/review", resource_id),
            &moderator,
            Some(json!({ "state": "dmca_takedown" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/resources/{}/review", resource_id),
            &admin,
            Some(json!({ "state": "dmca_takedown" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let resource = app.store.fetch_resource(resource_id).await.unwrap().unwrap();
    assert_eq!(resource.state, ResourceState::DmcaTakedown);
}

#[tokio::test]
async fn test_new_course_sentinel_creates_course() {
    let app = test_app();
    let token = app.token("student-1", Permission::Verified);

    let mut body = begin_body();
    body["course"] = json!({ "id": -1, "name": "Organic Chemistry", "teacher": "Dr. Wu" });

    let (status, begin) = app.action(&token, body).await;
    assert_eq!(status, StatusCode::OK);

    let resource = app
        .store
        .fetch_resource(begin["resource_id"].as_i64().unwrap())
        .await
        .unwrap()
        .unwrap();
    let course = app.store.course(resource.course_id.unwrap()).unwrap();
    assert_eq!(course.name, "Organic Chemistry");
    assert_eq!(course.teacher.as_deref(), Some("Dr. Wu"));
}

#[tokio::test]
async fn test_report_queues_notification() {
    let app = test_app();
    let token = app.token("student-1", Permission::Verified);

    let (_, begin) = app.action(&token, begin_body()).await;
    let resource_id = begin["resource_id"].as_i64().unwrap();

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/v1/resources/{}/report", resource_id),
            &token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(app
        .queue
        .enqueued()
        .iter()
        .any(|(job, _)| *job == Job::NotifyAdminReport { resource_id }));
}
