use std::path::PathBuf;
use std::time::Duration;

use nvenc_core::gate::ExecutionMode;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Fixed root all job directories live under.
    pub storage_root: PathBuf,
    /// Serial or parallel external-process execution, fixed for the
    /// process lifetime.
    pub execution_mode: ExecutionMode,
    /// Executable invoked for every bound command; doubles as the
    /// required leading token in command templates.
    pub ffmpeg_program: String,
    /// Wall-clock limit per external process in seconds; `0` disables
    /// the limit.
    pub exec_timeout_secs: u64,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds for non-encoding routes.
    pub request_timeout_secs: u64,
    /// Maximum accepted upload size in MiB.
    pub max_upload_mb: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `5000`                     |
    /// | `STORAGE_ROOT`         | `./storage`                |
    /// | `EXECUTION_MODE`       | `serial`                   |
    /// | `FFMPEG_PROGRAM`       | `ffmpeg`                   |
    /// | `EXEC_TIMEOUT_SECS`    | `0` (unbounded)            |
    /// | `CORS_ORIGINS`         | `*`                        |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `MAX_UPLOAD_MB`        | `2048`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let storage_root =
            PathBuf::from(std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".into()));

        let execution_mode: ExecutionMode = std::env::var("EXECUTION_MODE")
            .unwrap_or_else(|_| "serial".into())
            .parse()
            .expect("EXECUTION_MODE must be 'serial' or 'parallel'");

        let ffmpeg_program =
            std::env::var("FFMPEG_PROGRAM").unwrap_or_else(|_| "ffmpeg".into());

        let exec_timeout_secs: u64 = std::env::var("EXEC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("EXEC_TIMEOUT_SECS must be a valid u64");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_mb: u64 = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "2048".into())
            .parse()
            .expect("MAX_UPLOAD_MB must be a valid u64");

        Self {
            host,
            port,
            storage_root,
            execution_mode,
            ffmpeg_program,
            exec_timeout_secs,
            cors_origins,
            request_timeout_secs,
            max_upload_mb,
        }
    }

    /// The per-process execution timeout, `None` when disabled.
    pub fn exec_timeout(&self) -> Option<Duration> {
        (self.exec_timeout_secs > 0).then(|| Duration::from_secs(self.exec_timeout_secs))
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize) * 1024 * 1024
    }
}
