use super::sea_orm_active_enums::{FileType, UploadStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub trip_id: Uuid,
    pub segment_id: Uuid,
    pub filename: String,
    pub file_type: FileType,
    /// Declared digest, lowercase hex.
    pub sha256: String,
    pub upload_length: i64,
    /// Bytes durably written so far.
    #[sea_orm(column_name = "upload_offset", default_value = 0)]
    pub offset: i64,
    pub status: UploadStatus,
    /// Set once the session has produced its artifact.
    pub stored_file_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trips::Entity",
        from = "Column::TripId",
        to = "super::trips::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Trips,
    #[sea_orm(
        belongs_to = "super::segments::Entity",
        from = "Column::SegmentId",
        to = "super::segments::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Segments,
}

impl Related<super::trips::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl Related<super::segments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Segments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
