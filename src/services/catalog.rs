use crate::entities::sea_orm_active_enums::FileType;
use crate::entities::{prelude::*, *};
use crate::services::access::{self, Principal};
use crate::services::error::UploadError;
use crate::services::storage::{self, StorageService};
use crate::utils::validation::validate_filename;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// A verified file about to enter the catalog.
#[derive(Debug, Clone)]
pub struct NewStoredFile {
    pub id: Uuid,
    pub segment_id: Uuid,
    pub file_type: FileType,
    pub storage_uri: String,
    pub sha256: String,
    pub bytes: i64,
}

/// Partial update of a segment's denormalized file fields. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentPatch {
    pub file_size_bytes: Option<i64>,
    pub sha256: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SegmentPatch {
    pub fn is_empty(&self) -> bool {
        self.file_size_bytes.is_none() && self.sha256.is_none() && self.completed_at.is_none()
    }

    pub fn into_active_model(self) -> segments::ActiveModel {
        let mut active = segments::ActiveModel {
            ..Default::default()
        };
        if let Some(size) = self.file_size_bytes {
            active.file_size_bytes = Set(Some(size));
        }
        if let Some(sha256) = self.sha256 {
            active.sha256 = Set(Some(sha256));
        }
        if let Some(completed_at) = self.completed_at {
            active.completed_at = Set(Some(completed_at));
        }
        active
    }
}

/// What publishing `file` changes on its segment, if anything.
pub fn segment_side_effect(file: &stored_files::Model) -> Option<SegmentPatch> {
    file.file_type.is_primary_video().then(|| SegmentPatch {
        file_size_bytes: Some(file.bytes),
        sha256: Some(file.sha256.clone()),
        completed_at: Some(file.created_at),
    })
}

/// Inserts a StoredFile and applies its segment side effect on the same connection,
/// so callers inside a transaction get both or neither.
pub async fn publish<C: ConnectionTrait>(
    conn: &C,
    file: NewStoredFile,
) -> Result<stored_files::Model, DbErr> {
    let stored = stored_files::ActiveModel {
        id: Set(file.id),
        segment_id: Set(file.segment_id),
        file_type: Set(file.file_type),
        storage_uri: Set(file.storage_uri),
        sha256: Set(file.sha256),
        bytes: Set(file.bytes),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    if let Some(patch) = segment_side_effect(&stored) {
        apply_segment_patch(conn, stored.segment_id, patch).await?;
    }

    tracing::info!(
        "Published {:?} {} for segment {} ({} bytes)",
        stored.file_type,
        stored.id,
        stored.segment_id,
        stored.bytes
    );
    Ok(stored)
}

pub async fn apply_segment_patch<C: ConnectionTrait>(
    conn: &C,
    segment_id: Uuid,
    patch: SegmentPatch,
) -> Result<(), DbErr> {
    if patch.is_empty() {
        return Ok(());
    }
    Segments::update_many()
        .set(patch.into_active_model())
        .filter(segments::Column::Id.eq(segment_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetadataRequest {
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub content: String,
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoredFileRead {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub sha256: String,
    pub bytes: i64,
    pub storage_uri: String,
}

impl From<stored_files::Model> for StoredFileRead {
    fn from(file: stored_files::Model) -> Self {
        Self {
            id: file.id,
            file_type: file.file_type,
            sha256: file.sha256,
            bytes: file.bytes,
            storage_uri: file.storage_uri,
        }
    }
}

/// Writes small documents (GPS tracks, metadata) straight into the catalog, bypassing the
/// resumable upload path.
pub struct CatalogService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
}

impl CatalogService {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>) -> Self {
        Self { db, storage }
    }

    pub async fn attach_metadata(
        &self,
        principal: &Principal,
        segment_id: Uuid,
        req: MetadataRequest,
    ) -> Result<stored_files::Model, UploadError> {
        let (segment, _trip) = access::load_segment(&self.db, principal, segment_id).await?;

        if !req.file_type.is_inline_metadata() {
            return Err(UploadError::Invalid("Unsupported metadata type".to_string()));
        }

        let filename = match req.filename {
            Some(name) => validate_filename(&name)?,
            None => format!("metadata_{}.txt", req.file_type.to_value()),
        };

        let id = Uuid::new_v4();
        let key = storage::segment_file_key(segment.id, id, &filename);
        let written = self.storage.write_file(&key, req.content.as_bytes()).await?;

        let published = publish(
            &self.db,
            NewStoredFile {
                id,
                segment_id: segment.id,
                file_type: req.file_type,
                storage_uri: key.clone(),
                sha256: written.sha256,
                bytes: written.bytes,
            },
        )
        .await;

        match published {
            Ok(stored) => Ok(stored),
            Err(err) => {
                if let Err(cleanup) = self.storage.delete_file(&key).await {
                    tracing::error!("Failed to remove unpublished file {}: {}", key, cleanup);
                }
                Err(err.into())
            }
        }
    }
}
