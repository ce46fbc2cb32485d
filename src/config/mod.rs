use std::env;
use std::path::PathBuf;

/// Every variable is read as `BIKE_RECORDER_<NAME>`.
pub const ENV_PREFIX: &str = "BIKE_RECORDER_";

fn var(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{name}")).ok()
}

/// Upper bound accepted for `SESSION_TTL_HOURS` (ten years).
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 10;

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|v| v.parse().ok())
}

/// Runtime configuration for the upload server
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection string (default: `sqlite://bike_recorder.db?mode=rwc`)
    pub database_url: String,

    /// Root of the backing store for partial and published files (default: `./storage`)
    pub storage_dir: PathBuf,

    /// HS256 secret used to validate bearer tokens
    pub jwt_secret: String,

    /// Largest declared upload length accepted, in bytes (default: 4 GiB)
    pub max_upload_size: i64,

    /// Largest single chunk body accepted, in bytes (default: 32 MiB)
    pub max_chunk_size: usize,

    /// Sessions idle for longer than this are failed by the sweeper (default: 24)
    pub session_ttl_hours: u64,

    /// Seconds between sweeper runs (default: 3600)
    pub sweep_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://bike_recorder.db?mode=rwc".to_string(),
            storage_dir: PathBuf::from("./storage"),
            jwt_secret: "dev-secret-change-me".to_string(),
            max_upload_size: 4 * 1024 * 1024 * 1024, // 4 GiB
            max_chunk_size: 32 * 1024 * 1024,        // 32 MiB
            session_ttl_hours: 24,
            sweep_interval_secs: 3600,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            database_url: var("DATABASE_URL").unwrap_or(default.database_url),

            storage_dir: var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.storage_dir),

            jwt_secret: var("JWT_SECRET").unwrap_or(default.jwt_secret),

            max_upload_size: parsed("MAX_UPLOAD_SIZE").unwrap_or(default.max_upload_size),

            max_chunk_size: parsed("MAX_CHUNK_SIZE").unwrap_or(default.max_chunk_size),

            session_ttl_hours: parsed("SESSION_TTL_HOURS")
                .filter(|hours| *hours <= MAX_SESSION_TTL_HOURS)
                .unwrap_or(default.session_ttl_hours),

            sweep_interval_secs: parsed("SWEEP_INTERVAL_SECS")
                .unwrap_or(default.sweep_interval_secs),
        }
    }

    /// Config for local development and tests: in-memory database, small limits
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            storage_dir: PathBuf::from("./storage-dev"),
            jwt_secret: "dev-secret-change-me".to_string(),
            max_upload_size: 64 * 1024 * 1024,
            max_chunk_size: 8 * 1024 * 1024,
            session_ttl_hours: 24,
            sweep_interval_secs: 60,
        }
    }

    /// `None` when `session_ttl_hours` does not fit a `TimeDelta`.
    pub fn session_ttl(&self) -> Option<chrono::TimeDelta> {
        i64::try_from(self.session_ttl_hours)
            .ok()
            .and_then(chrono::TimeDelta::try_hours)
    }
}
