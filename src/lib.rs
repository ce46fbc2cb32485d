pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::catalog::CatalogService;
use crate::services::storage::StorageService;
use crate::services::upload_service::UploadService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, head, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::uploads::create_upload,
        api::handlers::uploads::head_upload,
        api::handlers::uploads::patch_upload,
        api::handlers::segments::attach_metadata,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            services::upload_service::CreateUploadRequest,
            services::upload_service::UploadRead,
            services::catalog::MetadataRequest,
            services::catalog::StoredFileRead,
            entities::sea_orm_active_enums::FileType,
            entities::sea_orm_active_enums::UploadStatus,
            api::handlers::health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "uploads", description = "Resumable upload endpoints"),
        (name = "segments", description = "Segment metadata endpoints"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub upload_service: Arc<UploadService>,
    pub catalog: Arc<CatalogService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: AppConfig) -> Self {
        let upload_service = Arc::new(UploadService::new(
            db.clone(),
            storage.clone(),
            config.clone(),
        ));
        let catalog = Arc::new(CatalogService::new(db.clone(), storage.clone()));

        Self {
            db,
            storage,
            upload_service,
            catalog,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/uploads", post(api::handlers::uploads::create_upload))
        .route(
            "/uploads/:id",
            head(api::handlers::uploads::head_upload)
                .patch(api::handlers::uploads::patch_upload)
                .layer(DefaultBodyLimit::max(state.config.max_chunk_size)),
        )
        .route(
            "/segments/:id/metadata",
            post(api::handlers::segments::attach_metadata),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .merge(protected)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
