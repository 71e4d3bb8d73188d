//! Execution gate: serial or parallel external-process scheduling.
//!
//! NVENC-class hardware encoders (and some CPU encoders) do not
//! reliably tolerate concurrent invocations, so the safe default runs
//! one external process at a time behind a single global lock. Parallel
//! mode is an explicit opt-in that turns the gate into a no-op.

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Concurrency policy, fixed once at service startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One external process at a time across all jobs.
    Serial,
    /// No gating; arbitrarily many concurrent processes.
    Parallel,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "parallel" => Ok(Self::Parallel),
            other => Err(format!(
                "invalid execution mode '{other}', expected 'serial' or 'parallel'"
            )),
        }
    }
}

/// The shared mutual-exclusion policy wrapping process launches.
///
/// Injected through application state rather than read from an ambient
/// flag, so tests can construct a gate per scenario.
#[derive(Debug, Clone)]
pub struct ExecutionGate {
    mode: ExecutionMode,
    /// Present only in serial mode.
    lock: Option<Arc<Mutex<()>>>,
}

/// RAII permit returned by [`ExecutionGate::acquire`]; the serial lock
/// is released when the permit drops, on every exit path.
#[derive(Debug)]
pub struct ExecutionPermit {
    _guard: Option<OwnedMutexGuard<()>>,
}

impl ExecutionGate {
    pub fn new(mode: ExecutionMode) -> Self {
        let lock = match mode {
            ExecutionMode::Serial => Some(Arc::new(Mutex::new(()))),
            ExecutionMode::Parallel => None,
        };
        Self { mode, lock }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Wait for permission to launch an external process.
    ///
    /// Serial mode blocks until the global lock frees up; fairness is
    /// whatever the tokio mutex provides, not a contract. Parallel mode
    /// returns immediately.
    pub async fn acquire(&self) -> ExecutionPermit {
        let guard = match &self.lock {
            Some(lock) => Some(Arc::clone(lock).lock_owned().await),
            None => None,
        };
        ExecutionPermit { _guard: guard }
    }
}
