//! Host CPU and memory sampling for the status endpoint.

use serde::Serialize;
use sysinfo::System;

/// Virtual-memory snapshot, byte counts.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStatus {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    /// Share of memory not available to new allocations, 0..100.
    pub percent: f32,
}

/// One host-wide sample.
#[derive(Debug, Clone, Serialize)]
pub struct HostStatus {
    pub cpu_percent: f32,
    pub memory: MemoryStatus,
}

/// Sample host CPU and memory usage.
///
/// CPU usage needs two readings a short interval apart, so this call
/// sleeps for [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] between them.
pub async fn sample() -> HostStatus {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_usage();
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    sys.refresh_cpu_usage();

    let total = sys.total_memory();
    let available = sys.available_memory();
    let percent = if total > 0 {
        (total.saturating_sub(available) as f64 / total as f64 * 100.0) as f32
    } else {
        0.0
    };

    HostStatus {
        cpu_percent: sys.global_cpu_usage(),
        memory: MemoryStatus {
            total,
            used: sys.used_memory(),
            available,
            percent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sample_reports_nonzero_memory() {
        let host = sample().await;
        assert!(host.memory.total > 0);
        assert!(host.memory.available <= host.memory.total);
        assert!(host.cpu_percent >= 0.0);
    }
}
