use std::sync::Arc;

use nvenc_core::gate::ExecutionGate;
use nvenc_core::job::JobRegistry;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable; the gate is the one piece of process-wide mutable
/// state and is injected here rather than read from an ambient flag, so
/// tests can build a state around whichever gate they need.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration, fixed at startup.
    pub config: Arc<ServerConfig>,
    /// Job identity and storage access.
    pub registry: JobRegistry,
    /// Serial/parallel mutual-exclusion policy around process launches.
    pub gate: ExecutionGate,
}
