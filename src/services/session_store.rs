use crate::entities::sea_orm_active_enums::{FileType, UploadStatus};
use crate::entities::{prelude::*, *};
use crate::services::catalog::{self, NewStoredFile};
use crate::services::error::UploadError;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

/// Upper bound on sessions returned by one stale scan.
const STALE_SCAN_LIMIT: u64 = 500;

/// Declared attributes of a new upload. All of them are fixed for the session's lifetime.
#[derive(Debug, Clone)]
pub struct NewUploadSession {
    pub trip_id: Uuid,
    pub segment_id: Uuid,
    pub filename: String,
    pub file_type: FileType,
    pub sha256: String,
    pub upload_length: i64,
}

/// Partial update of a session's mutable columns.
///
/// `None` leaves a column as it is, `Some` overwrites it. `updated_at` defaults to now
/// whenever any other field is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSessionPatch {
    pub offset: Option<i64>,
    pub status: Option<UploadStatus>,
    pub stored_file_id: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UploadSessionPatch {
    pub fn advance(offset: i64) -> Self {
        Self {
            offset: Some(offset),
            status: Some(UploadStatus::Receiving),
            ..Default::default()
        }
    }

    pub fn fail(offset: i64) -> Self {
        Self {
            offset: Some(offset),
            status: Some(UploadStatus::Failed),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offset.is_none()
            && self.status.is_none()
            && self.stored_file_id.is_none()
            && self.updated_at.is_none()
    }

    pub fn into_active_model(self) -> upload_sessions::ActiveModel {
        let touched = !self.is_empty();
        let mut active = upload_sessions::ActiveModel {
            ..Default::default()
        };

        if let Some(offset) = self.offset {
            active.offset = Set(offset);
        }
        if let Some(status) = self.status {
            active.status = Set(status);
        }
        if let Some(stored_file_id) = self.stored_file_id {
            active.stored_file_id = Set(Some(stored_file_id));
        }
        if touched {
            active.updated_at = Set(self.updated_at.unwrap_or_else(Utc::now));
        }

        active
    }
}

/// Persisted upload sessions. The single source of truth for resume decisions.
#[derive(Clone)]
pub struct UploadSessionStore {
    db: DatabaseConnection,
}

impl UploadSessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn create(
        &self,
        new: NewUploadSession,
    ) -> Result<upload_sessions::Model, UploadError> {
        let now = Utc::now();
        let session = upload_sessions::ActiveModel {
            id: Set(Uuid::new_v4()),
            trip_id: Set(new.trip_id),
            segment_id: Set(new.segment_id),
            filename: Set(new.filename),
            file_type: Set(new.file_type),
            sha256: Set(new.sha256),
            upload_length: Set(new.upload_length),
            offset: Set(0),
            status: Set(UploadStatus::Pending),
            stored_file_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(session.insert(&self.db).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<upload_sessions::Model>, UploadError> {
        Ok(UploadSessions::find_by_id(id).one(&self.db).await?)
    }

    /// Applies `patch` if the row still has the offset and status of `expected`.
    ///
    /// A row that moved on in the meantime yields `ConcurrentModification` and is left as is.
    pub async fn update(
        &self,
        expected: &upload_sessions::Model,
        patch: UploadSessionPatch,
    ) -> Result<upload_sessions::Model, UploadError> {
        let txn = self.db.begin().await?;
        let updated = Self::compare_and_set(&txn, expected, patch).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Publishes the artifact and marks the session COMPLETE in one transaction.
    pub async fn complete(
        &self,
        expected: &upload_sessions::Model,
        file: NewStoredFile,
    ) -> Result<(upload_sessions::Model, stored_files::Model), UploadError> {
        let txn = self.db.begin().await?;

        let stored = catalog::publish(&txn, file).await?;
        let session = Self::compare_and_set(
            &txn,
            expected,
            UploadSessionPatch {
                offset: Some(expected.upload_length),
                status: Some(UploadStatus::Complete),
                stored_file_id: Some(stored.id),
                updated_at: None,
            },
        )
        .await?;

        txn.commit().await?;
        Ok((session, stored))
    }

    /// Non-terminal sessions whose last update is older than `cutoff`, oldest first.
    pub async fn find_stale(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<upload_sessions::Model>, UploadError> {
        let sessions = UploadSessions::find()
            .filter(
                upload_sessions::Column::Status
                    .is_in([UploadStatus::Pending, UploadStatus::Receiving]),
            )
            .filter(upload_sessions::Column::UpdatedAt.lt(cutoff))
            .order_by_asc(upload_sessions::Column::UpdatedAt)
            .limit(STALE_SCAN_LIMIT)
            .all(&self.db)
            .await?;
        Ok(sessions)
    }

    async fn compare_and_set<C: ConnectionTrait>(
        conn: &C,
        expected: &upload_sessions::Model,
        patch: UploadSessionPatch,
    ) -> Result<upload_sessions::Model, UploadError> {
        if patch.is_empty() {
            return Ok(expected.clone());
        }

        let result = UploadSessions::update_many()
            .set(patch.into_active_model())
            .filter(upload_sessions::Column::Id.eq(expected.id))
            .filter(upload_sessions::Column::Offset.eq(expected.offset))
            .filter(upload_sessions::Column::Status.eq(expected.status))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            tracing::warn!(
                "Upload {} changed underneath a writer (expected offset {}, status {:?})",
                expected.id,
                expected.offset,
                expected.status
            );
            return Err(UploadError::ConcurrentModification);
        }

        UploadSessions::find_by_id(expected.id)
            .one(conn)
            .await?
            .ok_or(UploadError::NotFound("Upload"))
    }
}
