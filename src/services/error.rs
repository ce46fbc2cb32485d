use crate::utils::validation::ValidationError;
use sea_orm::DbErr;
use thiserror::Error;

/// Failures of the upload core. Each maps to one HTTP status in `api::error`.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Forbidden")]
    Forbidden,

    #[error("Upload already complete")]
    AlreadyComplete,

    #[error("Upload failed; start a new upload")]
    UploadFailed,

    #[error("Offset mismatch: expected {expected}, received {received}")]
    OffsetMismatch { expected: i64, received: i64 },

    #[error("Upload was modified concurrently")]
    ConcurrentModification,

    #[error("Chunk ends at byte {attempted}, past the declared length {upload_length}")]
    ExceedsDeclaredLength { upload_length: i64, attempted: i64 },

    #[error("Checksum mismatch")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("{0}")]
    Invalid(String),

    #[error("Storage fault: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ValidationError> for UploadError {
    fn from(err: ValidationError) -> Self {
        UploadError::Invalid(err.message)
    }
}

impl From<validator::ValidationErrors> for UploadError {
    fn from(err: validator::ValidationErrors) -> Self {
        UploadError::Invalid(err.to_string())
    }
}
