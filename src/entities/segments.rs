use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "segments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub trip_id: Uuid,
    #[sea_orm(column_name = "segment_index")]
    pub index: i32,
    /// Copied from the published primary video.
    pub file_size_bytes: Option<i64>,
    /// Copied from the published primary video.
    pub sha256: Option<String>,
    pub completed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trips::Entity",
        from = "Column::TripId",
        to = "super::trips::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Trips,
    #[sea_orm(has_many = "super::stored_files::Entity")]
    StoredFiles,
    #[sea_orm(has_many = "super::upload_sessions::Entity")]
    UploadSessions,
}

impl Related<super::trips::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl Related<super::stored_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoredFiles.def()
    }
}

impl Related<super::upload_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UploadSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
