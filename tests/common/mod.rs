#![allow(dead_code)]

use bike_recorder_backend::config::AppConfig;
use bike_recorder_backend::entities::sea_orm_active_enums::{FileType, TripStatus, UserRole};
use bike_recorder_backend::entities::{segments, trips, users};
use bike_recorder_backend::infrastructure::database::run_migrations;
use bike_recorder_backend::services::access::Principal;
use bike_recorder_backend::services::storage::{LocalStorage, StorageService};
use bike_recorder_backend::services::upload_service::{CreateUploadRequest, UploadService};
use bike_recorder_backend::utils::hash::calculate_hash;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub const CONTENT: &[u8] = b"bike recorder";

/// In-memory database on a single connection, so every query sees the same database.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt).await.unwrap();
    run_migrations(&db).await.unwrap();
    db
}

pub async fn seed_user(db: &DatabaseConnection, role: UserRole) -> users::Model {
    let id = Uuid::new_v4();
    users::ActiveModel {
        id: Set(id),
        email: Set(format!("{id}@example.com")),
        name: Set(Some("Rider".to_string())),
        role: Set(role),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_trip(db: &DatabaseConnection, user_id: Uuid) -> trips::Model {
    trips::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        start_time_utc: Set(Utc::now()),
        status: Set(TripStatus::Uploading),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_segment(db: &DatabaseConnection, trip_id: Uuid, index: i32) -> segments::Model {
    segments::ActiveModel {
        id: Set(Uuid::new_v4()),
        trip_id: Set(trip_id),
        index: Set(index),
        file_size_bytes: Set(None),
        sha256: Set(None),
        completed_at: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub struct TestContext {
    pub dir: TempDir,
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub owner: users::Model,
    pub trip: trips::Model,
    pub segment: segments::Model,
}

impl TestContext {
    /// One user owning one trip with one segment, and a fresh storage root.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = setup_db().await;

        let owner = seed_user(&db, UserRole::User).await;
        let trip = seed_trip(&db, owner.id).await;
        let segment = seed_segment(&db, trip.id, 0).await;

        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            storage_dir: dir.path().to_path_buf(),
            jwt_secret: "test-secret".to_string(),
            ..AppConfig::development()
        };

        Self {
            dir,
            db,
            config,
            owner,
            trip,
            segment,
        }
    }

    pub fn local_storage(&self) -> Arc<LocalStorage> {
        Arc::new(LocalStorage::new(self.config.storage_dir.clone()))
    }

    pub fn upload_service(&self, storage: Arc<dyn StorageService>) -> Arc<UploadService> {
        Arc::new(UploadService::new(
            self.db.clone(),
            storage,
            self.config.clone(),
        ))
    }

    pub fn owner_principal(&self) -> Principal {
        Principal::from(&self.owner)
    }

    /// Request for a video upload of `content` into the context's segment.
    pub fn request(&self, content: &[u8]) -> CreateUploadRequest {
        CreateUploadRequest {
            trip_id: self.trip.id,
            segment_id: self.segment.id,
            filename: "segment_0000.mp4".to_string(),
            file_type: FileType::VideoMp4,
            sha256: calculate_hash(content),
            upload_length: content.len() as i64,
        }
    }
}
