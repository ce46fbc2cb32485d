use bike_recorder_backend::config::AppConfig;
use bike_recorder_backend::infrastructure::{database, storage};
use bike_recorder_backend::services::worker::BackgroundWorker;
use bike_recorder_backend::{AppState, create_app};
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Api,
    Worker,
    All,
}

impl Mode {
    fn runs_api(self) -> bool {
        matches!(self, Mode::Api | Mode::All)
    }

    fn runs_worker(self) -> bool {
        matches!(self, Mode::Worker | Mode::All)
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service type to run
    #[arg(short, long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initial Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bike_recorder_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Bike Recorder Backend [Mode: {:?}]...", args.mode);

    // 2. Setup Common Infrastructure
    let config = AppConfig::from_env();
    info!(
        "🛡️  Upload limits: Max Size={}MB, Max Chunk={}MB, Session TTL={}h",
        config.max_upload_size / 1024 / 1024,
        config.max_chunk_size / 1024 / 1024,
        config.session_ttl_hours
    );

    let db = database::setup_database(&config).await?;
    let storage_service = storage::setup_storage(&config).await?;
    let state = AppState::new(db, storage_service, config);

    // 3. Setup Graceful Shutdown Channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();

    // 4. Initialize Worker Service
    if args.mode.runs_worker() {
        let worker = BackgroundWorker::new(state.upload_service.clone(), shutdown_rx.clone());
        handles.push(tokio::spawn(worker.run()));
        info!("👷 Worker service initialized.");
    }

    // 5. Initialize API Service
    if args.mode.runs_api() {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            );

        let app = create_app(state.clone()).layer(trace_layer);
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
        info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

        let mut server_shutdown = shutdown_rx.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.changed().await;
                })
                .await
            {
                error!("❌ Server runtime error: {}", e);
            }
        }));
    }

    // 6. Wait for Shutdown Signal, then stop every service
    shutdown_signal().await;
    info!("🛑 Shutting down backend services...");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Service task ended abnormally: {}", e);
        }
    }

    info!("👋 Backend exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
