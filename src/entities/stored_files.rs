use super::sea_orm_active_enums::FileType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A published, immutable artifact. Rows are only ever inserted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stored_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub segment_id: Uuid,
    pub file_type: FileType,
    /// Path relative to the storage root.
    pub storage_uri: String,
    pub sha256: String,
    pub bytes: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::segments::Entity",
        from = "Column::SegmentId",
        to = "super::segments::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Segments,
}

impl Related<super::segments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Segments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
