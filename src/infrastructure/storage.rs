use crate::config::AppConfig;
use crate::services::storage::LocalStorage;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> anyhow::Result<Arc<LocalStorage>> {
    let root = &config.storage_dir;
    tokio::fs::create_dir_all(root).await?;

    info!("💾 Storage root: {}", root.display());

    Ok(Arc::new(LocalStorage::new(root.clone())))
}
