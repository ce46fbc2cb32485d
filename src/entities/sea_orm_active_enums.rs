use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[sea_orm(string_value = "recording")]
    Recording,
    #[sea_orm(string_value = "queued")]
    Queued,
    #[sea_orm(string_value = "uploading")]
    Uploading,
    #[sea_orm(string_value = "complete")]
    Complete,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Kind of artifact attached to a segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum FileType {
    #[sea_orm(string_value = "video_mp4")]
    #[serde(rename = "video_mp4")]
    VideoMp4,
    #[sea_orm(string_value = "gps_gpx")]
    #[serde(rename = "gps_gpx")]
    GpsGpx,
    #[sea_orm(string_value = "gps_jsonl")]
    #[serde(rename = "gps_jsonl")]
    GpsJsonl,
    #[sea_orm(string_value = "thumbnail_jpg")]
    #[serde(rename = "thumbnail_jpg")]
    ThumbnailJpeg,
    #[sea_orm(string_value = "metadata_json")]
    #[serde(rename = "metadata_json")]
    MetadataJson,
}

impl FileType {
    /// The segment's primary recording. Publishing one updates the segment's size and digest.
    pub fn is_primary_video(self) -> bool {
        matches!(self, FileType::VideoMp4)
    }

    /// Types that may be attached inline as text rather than uploaded.
    pub fn is_inline_metadata(self) -> bool {
        matches!(
            self,
            FileType::GpsGpx | FileType::GpsJsonl | FileType::MetadataJson
        )
    }
}

/// Lifecycle of a resumable upload.
///
/// `Pending -> Receiving -> Complete | Failed`. `Complete` and `Failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "receiving")]
    Receiving,
    #[sea_orm(string_value = "complete")]
    Complete,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Complete | UploadStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&FileType::ThumbnailJpeg).unwrap(),
            "\"thumbnail_jpg\""
        );
        assert_eq!(
            serde_json::from_str::<FileType>("\"gps_jsonl\"").unwrap(),
            FileType::GpsJsonl
        );
        assert_eq!(FileType::MetadataJson.to_value(), "metadata_json");
    }

    #[test]
    fn test_file_type_classes() {
        assert!(FileType::VideoMp4.is_primary_video());
        assert!(!FileType::VideoMp4.is_inline_metadata());
        assert!(FileType::GpsGpx.is_inline_metadata());
        assert!(!FileType::ThumbnailJpeg.is_inline_metadata());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!UploadStatus::Pending.is_terminal());
        assert!(!UploadStatus::Receiving.is_terminal());
        assert!(UploadStatus::Complete.is_terminal());
        assert!(UploadStatus::Failed.is_terminal());
    }
}
