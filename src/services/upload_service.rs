//! Upload session orchestration.
//!
//! Three-phase handoff driven entirely by the client: begin creates the
//! resource row and the storage-side multipart upload, every part URL
//! request is re-validated against the signed handoff token, and finalize
//! merges the parts and moves the resource into moderation. No session
//! state lives on the server between phases; token possession is the
//! authorization for the part and finalize phases.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{review::reason, NewResource, NewReviewRecord, ResourceState};
use crate::queue::{Job, JobQueue};
use crate::services::handoff_token::{session_payload, TokenSigner};
use crate::storage::{CompletedPart, ObjectStore};
use crate::store::ResourceStore;

/// Fixed upload chunk size (20 MiB). Only used to size the client's part
/// count for progress display; the server trusts whatever part numbers the
/// client presents at finalize.
pub const CHUNK_SIZE: u64 = 20 * 1024 * 1024;

/// Largest part number S3 accepts.
const MAX_PART_NUMBER: u32 = 10_000;

/// Number of chunks a file of `file_size` bytes splits into.
pub fn chunk_count(file_size: u64) -> u64 {
    file_size.div_ceil(CHUNK_SIZE)
}

/// Course referenced by an upload draft. A negative id is the client-side
/// sentinel for "create this course first".
#[derive(Debug, Clone)]
pub struct CourseSelection {
    pub id: i64,
    pub name: String,
    pub teacher: Option<String>,
}

/// Draft metadata submitted at upload begin.
#[derive(Debug, Clone)]
pub struct UploadDraft {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub course: Option<CourseSelection>,
    pub category: String,
    pub filename: String,
    pub file_size: Option<u64>,
}

/// Everything the client must echo back verbatim on later phases.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadTicket {
    pub resource_id: i64,
    pub upload_id: String,
    pub storage_key: String,
    pub token: String,
    /// Part count hint for progress display, when the client declared a size
    pub chunk_count: Option<u64>,
}

/// Part URL request: the begin tuple plus a 1-based part number.
#[derive(Debug, Clone)]
pub struct PartUrlRequest {
    pub resource_id: i64,
    pub upload_id: String,
    pub storage_key: String,
    pub token: String,
    pub part_number: u32,
}

/// Finalize request: the begin tuple plus the client's collected parts.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub resource_id: i64,
    pub upload_id: String,
    pub storage_key: String,
    pub token: String,
    pub parts: Vec<CompletedPart>,
}

/// Orchestrates the upload handoff and the resource lifecycle it drives.
pub struct UploadService {
    store: Arc<dyn ResourceStore>,
    objects: Arc<dyn ObjectStore>,
    queue: Arc<dyn JobQueue>,
    signer: TokenSigner,
    part_url_ttl: Duration,
    cleanup_grace: Duration,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        objects: Arc<dyn ObjectStore>,
        queue: Arc<dyn JobQueue>,
        signer: TokenSigner,
        part_url_ttl: Duration,
        cleanup_grace: Duration,
    ) -> Self {
        Self {
            store,
            objects,
            queue,
            signer,
            part_url_ttl,
            cleanup_grace,
        }
    }

    /// Begin an upload session.
    ///
    /// Inserts the resource row in `Uploading` state under a fresh opaque
    /// storage key, opens the storage-side multipart upload, signs the
    /// handoff token, and schedules the delayed orphan cleanup job.
    pub async fn begin(&self, draft: UploadDraft, uploader_id: &str) -> Result<UploadTicket> {
        let course_id = match &draft.course {
            Some(course) if course.id < 0 => {
                // New-course sentinel: create the row and use the real id
                let id = self
                    .store
                    .create_course(&course.name, course.teacher.as_deref())
                    .await?;
                Some(id)
            }
            Some(course) => Some(course.id),
            None => None,
        };

        // Server-generated object key, never the user-supplied filename
        let storage_key = Uuid::new_v4().to_string();

        let resource = self
            .store
            .insert_resource(NewResource {
                name: draft.name,
                description: draft.description,
                tags: draft.tags,
                course_id,
                category: draft.category,
                storage_key: storage_key.clone(),
                filename: draft.filename,
                uploaded_by: uploader_id.to_string(),
            })
            .await?;

        let upload_id = self.objects.create_multipart_upload(&storage_key).await?;
        let token = self.signer.sign(&session_payload(&upload_id, &storage_key));

        // Reclaim the row if the client never finishes
        self.queue
            .enqueue(
                Job::UnuploadDataRemoval {
                    resource_id: resource.id,
                },
                Some(self.cleanup_grace),
            )
            .await?;

        tracing::info!(
            resource_id = resource.id,
            uploader = %uploader_id,
            "Upload session started"
        );

        Ok(UploadTicket {
            resource_id: resource.id,
            upload_id,
            storage_key,
            token,
            chunk_count: draft.file_size.map(chunk_count),
        })
    }

    /// Mint a presigned URL for one part.
    ///
    /// Idempotent: no record is kept of which parts were requested, so the
    /// client may re-request any part number and race requests for
    /// different parts freely. Returns `None` when the token does not
    /// verify; the caller treats that as a plain denial.
    pub async fn request_part_url(&self, req: &PartUrlRequest) -> Result<Option<String>> {
        if !self.verify(&req.upload_id, &req.storage_key, &req.token) {
            return Ok(None);
        }
        if req.part_number == 0 || req.part_number > MAX_PART_NUMBER {
            tracing::debug!(part_number = req.part_number, "Part number out of range");
            return Ok(None);
        }

        let url = self
            .objects
            .presign_part_url(
                &req.storage_key,
                &req.upload_id,
                req.part_number,
                self.part_url_ttl,
            )
            .await?;
        Ok(Some(url))
    }

    /// Finalize the upload.
    ///
    /// Completes the storage-side merge first; only once storage has
    /// acknowledged do the database writes count. The state transition and
    /// the review trail entry race each other deliberately, nothing
    /// depends on their relative order. Returns `None` when the token does
    /// not verify.
    pub async fn finalize(&self, req: &FinalizeRequest) -> Result<Option<()>> {
        if !self.verify(&req.upload_id, &req.storage_key, &req.token) {
            return Ok(None);
        }

        self.objects
            .complete_multipart_upload(&req.storage_key, &req.upload_id, &req.parts)
            .await?;

        let db_writes = tokio::try_join!(
            self.store.transition_state(
                req.resource_id,
                ResourceState::Uploading,
                ResourceState::Pending,
            ),
            self.store.insert_review(NewReviewRecord::automatic(
                req.resource_id,
                reason::UPLOADED,
                ResourceState::Pending,
            )),
        );

        let moved = match db_writes {
            Ok((moved, _)) => moved,
            Err(e) => {
                // A row stuck in uploading will be reclaimed by cleanup,
                // which would leak the stored object. But if the transition
                // itself committed before the failure, the row owns the
                // object now and deleting it would strand a live resource.
                let row_moved = matches!(
                    self.store.fetch_resource(req.resource_id).await,
                    Ok(Some(resource)) if resource.state != ResourceState::Uploading
                );
                tracing::warn!(
                    resource_id = req.resource_id,
                    row_moved,
                    error = %e,
                    "Finalize database writes failed after storage complete"
                );
                if !row_moved {
                    if let Err(del) = self.objects.delete_object(&req.storage_key).await {
                        tracing::error!(
                            storage_key = %req.storage_key,
                            error = %del,
                            "Failed to remove orphaned object"
                        );
                    }
                }
                return Err(e);
            }
        };

        if !moved {
            tracing::info!(
                resource_id = req.resource_id,
                "Resource was not in uploading state at finalize, leaving state untouched"
            );
        }

        self.queue
            .enqueue(
                Job::AutoReview {
                    resource_id: req.resource_id,
                },
                None,
            )
            .await?;

        tracing::info!(resource_id = req.resource_id, "Upload finalized");
        Ok(Some(()))
    }

    fn verify(&self, upload_id: &str, storage_key: &str, token: &str) -> bool {
        let ok = self
            .signer
            .verify(&session_payload(upload_id, storage_key), token);
        if !ok {
            tracing::warn!("Upload handoff token rejected");
        }
        ok
    }
}
