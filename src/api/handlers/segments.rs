use crate::AppState;
use crate::api::error::AppError;
use crate::services::access::Principal;
use crate::services::catalog::{MetadataRequest, StoredFileRead};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/segments/{id}/metadata",
    params(
        ("id" = Uuid, Path, description = "Segment ID")
    ),
    request_body = MetadataRequest,
    responses(
        (status = 201, description = "Metadata stored", body = StoredFileRead),
        (status = 400, description = "Unsupported type or invalid filename"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Segment not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "segments"
)]
pub async fn attach_metadata(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(segment_id): Path<Uuid>,
    Json(req): Json<MetadataRequest>,
) -> Result<impl IntoResponse, AppError> {
    let stored = state
        .catalog
        .attach_metadata(&principal, segment_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(StoredFileRead::from(stored))))
}
