use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse),
        (status = 503, description = "Database or storage unavailable", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.db.ping().await.is_ok();
    let storage_ok = match state.storage.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Storage health check failed: {}", e);
            false
        }
    };

    let label = |ok: bool| if ok { "connected" } else { "disconnected" }.to_string();
    let healthy = db_ok && storage_ok;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            database: label(db_ok),
            storage: label(storage_ok),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
