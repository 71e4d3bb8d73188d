use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::gpu::{GpuCollector, GpuStatus};
use crate::host::{self, HostStatus, MemoryStatus};
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// System status response payload.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    /// Host operating system (`linux`, `macos`, `windows`, ...).
    pub system: &'static str,
    /// Host-wide CPU utilization, 0..100.
    pub cpu_percent: f32,
    /// Virtual-memory snapshot in bytes.
    pub memory: MemoryStatus,
    /// One snapshot per visible GPU; empty without NVIDIA drivers.
    pub gpus: Vec<GpuStatus>,
}

/// GET /health -- liveness probe.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /status -- host and GPU status.
///
/// NVML is initialised per request, mirroring how rarely this endpoint
/// is polled; hosts without NVIDIA drivers simply report no GPUs.
async fn system_status() -> Json<StatusResponse> {
    let HostStatus {
        cpu_percent,
        memory,
    } = host::sample().await;
    let gpus = GpuCollector::new().collect();
    Json(StatusResponse {
        status: "ok",
        system: std::env::consts::OS,
        cpu_percent,
        memory,
        gpus,
    })
}

/// Mount health and status routes at the root level.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(system_status))
}
