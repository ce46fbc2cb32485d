use crate::services::error::UploadError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage fault: {0}")]
    StorageFault(#[from] std::io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        match err {
            UploadError::NotFound(_) => AppError::NotFound(message),
            UploadError::Forbidden => AppError::Forbidden(message),
            UploadError::AlreadyComplete
            | UploadError::UploadFailed
            | UploadError::OffsetMismatch { .. }
            | UploadError::ConcurrentModification => AppError::Conflict(message),
            UploadError::ChecksumMismatch { .. } => AppError::UnprocessableEntity(message),
            UploadError::ExceedsDeclaredLength { .. } => AppError::PayloadTooLarge(message),
            UploadError::Invalid(msg) => AppError::BadRequest(msg),
            UploadError::Storage(e) => AppError::StorageFault(e),
            UploadError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::StorageFault(e) => {
                tracing::error!("Storage fault: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage fault".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: UploadError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_upload_errors_map_to_statuses() {
        assert_eq!(status_of(UploadError::NotFound("Upload")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(UploadError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_of(UploadError::AlreadyComplete), StatusCode::CONFLICT);
        assert_eq!(status_of(UploadError::UploadFailed), StatusCode::CONFLICT);
        assert_eq!(
            status_of(UploadError::OffsetMismatch {
                expected: 0,
                received: 5
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(UploadError::ChecksumMismatch {
                expected: "a".into(),
                actual: "b".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(UploadError::ExceedsDeclaredLength {
                upload_length: 13,
                attempted: 14
            }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(UploadError::Invalid("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(UploadError::Storage(std::io::Error::other("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_unauthorized_renders_json_error() {
        use http_body_util::BodyExt;

        let response = AppError::Unauthorized("Missing bearer token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Missing bearer token");
    }
}
