use crate::config::AppConfig;
use crate::entities::{segments, stored_files, trips, upload_sessions, users};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

pub async fn setup_database(config: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    let db_url = &config.database_url;

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    // Every pooled connection to an in-memory SQLite database is a separate database
    if db_url.contains(":memory:") {
        opt.max_connections(1).min_connections(1);
    }

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Order matters for foreign keys: users -> trips -> segments -> stored_files -> upload_sessions
    let stmts = vec![
        (
            "users",
            schema
                .create_table_from_entity(users::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "trips",
            schema
                .create_table_from_entity(trips::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "segments",
            schema
                .create_table_from_entity(segments::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "stored_files",
            schema
                .create_table_from_entity(stored_files::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "upload_sessions",
            schema
                .create_table_from_entity(upload_sessions::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        db.execute(stmt).await?;
        info!("   - Table '{}' checked/created", name);
    }

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_upload_sessions_status_updated_at ON upload_sessions(status, updated_at)",
        "CREATE INDEX IF NOT EXISTS idx_stored_files_segment_id ON stored_files(segment_id)",
        "CREATE INDEX IF NOT EXISTS idx_segments_trip_id ON segments(trip_id)",
    ];

    for query in indexes {
        match db
            .execute(sea_orm::Statement::from_string(builder, query.to_string()))
            .await
        {
            Ok(_) => info!("   - Executed schema update: {}", query),
            Err(e) => tracing::warn!("   - Schema update warning: {} -> {}", query, e),
        }
    }

    Ok(())
}
