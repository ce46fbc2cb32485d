use crate::AppState;
use crate::api::error::AppError;
use crate::services::access::Principal;
use crate::services::upload_service::{CreateUploadRequest, UploadRead};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use uuid::Uuid;

pub const UPLOAD_OFFSET: HeaderName = HeaderName::from_static("upload-offset");
pub const UPLOAD_LENGTH: HeaderName = HeaderName::from_static("upload-length");

fn parse_upload_offset(headers: &HeaderMap) -> Result<i64, AppError> {
    let raw = headers
        .get(&UPLOAD_OFFSET)
        .ok_or_else(|| AppError::BadRequest("Missing Upload-Offset header".to_string()))?;

    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|offset| *offset >= 0)
        .ok_or_else(|| AppError::BadRequest("Invalid Upload-Offset header".to_string()))
}

#[utoipa::path(
    post,
    path = "/uploads",
    request_body = CreateUploadRequest,
    responses(
        (status = 201, description = "Upload session created", body = UploadRead),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Trip belongs to another user"),
        (status = 404, description = "Trip or segment not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "uploads"
)]
pub async fn create_upload(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.upload_service.create_upload(&principal, req).await?;
    Ok((StatusCode::CREATED, Json(UploadRead::from(session))))
}

#[utoipa::path(
    head,
    path = "/uploads/{id}",
    params(
        ("id" = Uuid, Path, description = "Upload session ID")
    ),
    responses(
        (status = 204, description = "Current offset in the Upload-Offset header"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Upload not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "uploads"
)]
pub async fn head_upload(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let progress = state.upload_service.probe(id, &principal).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [
            (UPLOAD_OFFSET, HeaderValue::from(progress.offset)),
            (UPLOAD_LENGTH, HeaderValue::from(progress.upload_length)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
    )
        .into_response())
}

#[utoipa::path(
    patch,
    path = "/uploads/{id}",
    params(
        ("id" = Uuid, Path, description = "Upload session ID"),
        ("Upload-Offset" = i64, Header, description = "Offset the chunk starts at")
    ),
    request_body(content = Vec<u8>, content_type = "application/offset+octet-stream"),
    responses(
        (status = 204, description = "Chunk accepted, new offset in the Upload-Offset header"),
        (status = 400, description = "Missing or invalid Upload-Offset"),
        (status = 409, description = "Offset mismatch, or upload already complete or failed"),
        (status = 413, description = "Chunk runs past the declared length"),
        (status = 422, description = "Checksum mismatch, upload failed")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "uploads"
)]
pub async fn patch_upload(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let offset = parse_upload_offset(&headers)?;
    let new_offset = state
        .upload_service
        .submit_chunk(id, &principal, offset, &body)
        .await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(UPLOAD_OFFSET, HeaderValue::from(new_offset))],
    )
        .into_response())
}
