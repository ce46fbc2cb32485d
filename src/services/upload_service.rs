use crate::config::AppConfig;
use crate::entities::sea_orm_active_enums::{FileType, UploadStatus};
use crate::entities::upload_sessions;
use crate::services::access::{self, Principal};
use crate::services::catalog::NewStoredFile;
use crate::services::error::UploadError;
use crate::services::session_store::{NewUploadSession, UploadSessionPatch, UploadSessionStore};
use crate::services::storage::{self, StorageService};
use crate::utils::hash::digests_match;
use crate::utils::keyed_mutex::KeyedMutex;
use crate::utils::validation::{validate_digest, validate_filename, validate_upload_length};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateUploadRequest {
    pub trip_id: Uuid,
    pub segment_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Filename must be between 1 and 255 characters"))]
    pub filename: String,
    pub file_type: FileType,
    pub sha256: String,
    #[validate(range(min = 1, message = "Upload length must be positive"))]
    pub upload_length: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadRead {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub segment_id: Uuid,
    pub filename: String,
    pub file_type: FileType,
    pub sha256: String,
    pub upload_length: i64,
    pub offset: i64,
    pub status: UploadStatus,
}

impl From<upload_sessions::Model> for UploadRead {
    fn from(session: upload_sessions::Model) -> Self {
        Self {
            id: session.id,
            trip_id: session.trip_id,
            segment_id: session.segment_id,
            filename: session.filename,
            file_type: session.file_type,
            sha256: session.sha256,
            upload_length: session.upload_length,
            offset: session.offset,
            status: session.status,
        }
    }
}

/// Answer to a resume probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub offset: i64,
    pub upload_length: i64,
    pub status: UploadStatus,
}

/// Drives upload sessions through PENDING -> RECEIVING -> COMPLETE | FAILED.
///
/// Chunk submission for one upload id is serialized by an in-process lock; the session
/// store's compare-and-swap catches any writer that gets past it.
pub struct UploadService {
    store: UploadSessionStore,
    storage: Arc<dyn StorageService>,
    locks: KeyedMutex<Uuid>,
    config: AppConfig,
}

impl UploadService {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: AppConfig) -> Self {
        Self {
            store: UploadSessionStore::new(db),
            storage,
            locks: KeyedMutex::new(),
            config,
        }
    }

    pub fn store(&self) -> &UploadSessionStore {
        &self.store
    }

    pub fn locks(&self) -> &KeyedMutex<Uuid> {
        &self.locks
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn create_upload(
        &self,
        principal: &Principal,
        req: CreateUploadRequest,
    ) -> Result<upload_sessions::Model, UploadError> {
        req.validate()?;
        validate_upload_length(req.upload_length, self.config.max_upload_size)?;
        let sha256 = validate_digest(&req.sha256)?;
        let filename = validate_filename(&req.filename)?;

        let (trip, segment) =
            access::load_trip_segment(self.store.connection(), principal, req.trip_id, req.segment_id)
                .await?;

        let session = self
            .store
            .create(NewUploadSession {
                trip_id: trip.id,
                segment_id: segment.id,
                filename,
                file_type: req.file_type,
                sha256,
                upload_length: req.upload_length,
            })
            .await?;

        tracing::info!(
            "Created upload {} for segment {} ({:?}, {} bytes)",
            session.id,
            session.segment_id,
            session.file_type,
            session.upload_length
        );
        Ok(session)
    }

    /// Current offset and declared length. Takes no lock and changes nothing.
    pub async fn probe(
        &self,
        upload_id: Uuid,
        principal: &Principal,
    ) -> Result<UploadProgress, UploadError> {
        let session = self.load_authorized(upload_id, principal).await?;
        Ok(UploadProgress {
            offset: session.offset,
            upload_length: session.upload_length,
            status: session.status,
        })
    }

    /// Appends `payload` at `request_offset` and returns the new offset.
    ///
    /// The chunk that reaches the declared length also finalizes the upload: the file is
    /// moved into place, its digest checked, and it is published or the session failed.
    pub async fn submit_chunk(
        &self,
        upload_id: Uuid,
        principal: &Principal,
        request_offset: i64,
        payload: &[u8],
    ) -> Result<i64, UploadError> {
        let _guard = self.locks.lock(&upload_id).await;
        let session = self.load_authorized(upload_id, principal).await?;

        match session.status {
            UploadStatus::Complete => return Err(UploadError::AlreadyComplete),
            UploadStatus::Failed => return Err(UploadError::UploadFailed),
            UploadStatus::Pending | UploadStatus::Receiving => {}
        }

        if request_offset != session.offset {
            tracing::warn!(
                "Upload {} offset mismatch: expected {}, received {}",
                upload_id,
                session.offset,
                request_offset
            );
            return Err(UploadError::OffsetMismatch {
                expected: session.offset,
                received: request_offset,
            });
        }

        if payload.is_empty() {
            return Ok(session.offset);
        }

        let new_offset = i64::try_from(payload.len())
            .ok()
            .and_then(|len| session.offset.checked_add(len))
            .filter(|end| *end <= session.upload_length)
            .ok_or(UploadError::ExceedsDeclaredLength {
                upload_length: session.upload_length,
                attempted: session.offset.saturating_add(payload.len() as i64),
            })?;

        let key = storage::partial_key(session.id);
        if let Err(err) = self
            .storage
            .write_chunk(&key, payload, session.offset as u64)
            .await
        {
            tracing::error!(
                "Chunk write for upload {} at offset {} failed: {}",
                upload_id,
                session.offset,
                err
            );
            return Err(err.into());
        }

        if new_offset < session.upload_length {
            let updated = self
                .store
                .update(&session, UploadSessionPatch::advance(new_offset))
                .await?;
            return Ok(updated.offset);
        }

        self.finalize(&session).await
    }

    async fn finalize(&self, session: &upload_sessions::Model) -> Result<i64, UploadError> {
        let partial = storage::partial_key(session.id);
        let dest = storage::segment_file_key(session.segment_id, session.id, &session.filename);

        let finalized = self.storage.finalize(&partial, &dest).await.map_err(|err| {
            tracing::error!("Finalizing upload {} failed: {}", session.id, err);
            err
        })?;

        if !digests_match(&session.sha256, &finalized.sha256) {
            tracing::warn!(
                "Checksum mismatch for upload {}: declared {}, computed {}",
                session.id,
                session.sha256,
                finalized.sha256
            );
            if let Err(err) = self
                .store
                .update(session, UploadSessionPatch::fail(session.upload_length))
                .await
            {
                // The session keeps its old offset, so the bytes go back to the partial path
                self.restore_partial(&dest, &partial).await;
                return Err(err);
            }
            if let Err(err) = self.storage.delete_file(&dest).await {
                tracing::error!("Failed to delete rejected file {}: {}", dest, err);
            }
            return Err(UploadError::ChecksumMismatch {
                expected: session.sha256.clone(),
                actual: finalized.sha256,
            });
        }

        let file = NewStoredFile {
            id: Uuid::new_v4(),
            segment_id: session.segment_id,
            file_type: session.file_type,
            storage_uri: dest.clone(),
            sha256: finalized.sha256,
            bytes: finalized.bytes,
        };

        match self.store.complete(session, file).await {
            Ok((completed, stored)) => {
                tracing::info!(
                    "Upload {} complete, published as {}",
                    completed.id,
                    stored.id
                );
                Ok(completed.offset)
            }
            Err(err) => {
                // Keep the upload resumable: the bytes go back where the next attempt expects them
                self.restore_partial(&dest, &partial).await;
                Err(err)
            }
        }
    }

    async fn restore_partial(&self, dest: &str, partial: &str) {
        if let Err(err) = self.storage.restore(dest, partial).await {
            tracing::error!("Could not restore {} to {}: {}", dest, partial, err);
        }
    }

    /// Fails PENDING/RECEIVING sessions idle past the session TTL and removes their partial
    /// files. Returns how many were expired.
    pub async fn expire_stale_sessions(&self, now: DateTime<Utc>) -> Result<usize, UploadError> {
        let cutoff = self
            .config
            .session_ttl()
            .and_then(|ttl| now.checked_sub_signed(ttl))
            .ok_or_else(|| {
                UploadError::Invalid(format!(
                    "Session TTL of {} hours is out of range",
                    self.config.session_ttl_hours
                ))
            })?;
        let candidates = self.store.find_stale(cutoff).await?;
        let mut expired = 0;

        for candidate in candidates {
            let _guard = self.locks.lock(&candidate.id).await;

            // Re-read under the lock; a chunk may have landed since the scan
            let Some(session) = self.store.get(candidate.id).await? else {
                continue;
            };
            if session.is_terminal() || session.updated_at >= cutoff {
                continue;
            }

            match self
                .store
                .update(&session, UploadSessionPatch::fail(session.offset))
                .await
            {
                Ok(_) => {}
                Err(UploadError::ConcurrentModification) => continue,
                Err(err) => return Err(err),
            }

            if let Err(err) = self
                .storage
                .delete_file(&storage::partial_key(session.id))
                .await
            {
                tracing::warn!("Failed to remove partial file of upload {}: {}", session.id, err);
            }

            tracing::info!(
                "Expired upload {} idle since {} at offset {}/{}",
                session.id,
                session.updated_at,
                session.offset,
                session.upload_length
            );
            expired += 1;
        }

        Ok(expired)
    }

    async fn load_authorized(
        &self,
        upload_id: Uuid,
        principal: &Principal,
    ) -> Result<upload_sessions::Model, UploadError> {
        let session = self
            .store
            .get(upload_id)
            .await?
            .ok_or(UploadError::NotFound("Upload"))?;
        access::authorize_session(self.store.connection(), principal, &session).await?;
        Ok(session)
    }
}
