//! NVML-based GPU status snapshots for the `/status` endpoint.
//!
//! NVML initialisation is **gracefully optional** -- if the host has no
//! NVIDIA drivers (e.g. a developer laptop), the collector logs a
//! warning and reports zero GPUs instead of panicking.

use nvml_wrapper::Nvml;
use serde::Serialize;

/// Per-GPU snapshot reported by `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct GpuStatus {
    pub index: u32,
    pub name: String,
    pub uuid: String,
    pub utilization_percent: u32,
    pub memory_used_mb: u32,
    pub memory_total_mb: u32,
    /// NVENC utilization; not all devices report it.
    pub encoder_utilization_percent: Option<u32>,
    /// NVDEC utilization; not all devices report it.
    pub decoder_utilization_percent: Option<u32>,
}

/// Wraps NVML and provides a single `collect()` returning a snapshot
/// for every GPU visible on the host.
pub struct GpuCollector {
    /// `None` when NVML could not be initialised (no drivers / no GPU).
    nvml: Option<Nvml>,
}

const BYTES_PER_MB: u64 = 1024 * 1024;

impl Default for GpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuCollector {
    /// Attempt to initialise NVML.
    ///
    /// Returns a collector that reports zero GPUs if NVML is not
    /// available (missing drivers, no NVIDIA hardware, etc.).
    pub fn new() -> Self {
        let nvml = match Nvml::init() {
            Ok(nvml) => Some(nvml),
            Err(e) => {
                tracing::warn!(error = %e, "NVML unavailable -- /status will report no GPUs");
                None
            }
        };
        Self { nvml }
    }

    /// Collect a status snapshot for every GPU on the host.
    ///
    /// Errors on individual devices are logged and the device is
    /// skipped rather than failing the entire collection pass.
    pub fn collect(&self) -> Vec<GpuStatus> {
        let nvml = match self.nvml.as_ref() {
            Some(nvml) => nvml,
            None => return Vec::new(),
        };

        let device_count = match nvml.device_count() {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query GPU device count");
                return Vec::new();
            }
        };

        let mut snapshots = Vec::with_capacity(device_count as usize);
        for idx in 0..device_count {
            match Self::collect_device(nvml, idx) {
                Ok(s) => snapshots.push(s),
                Err(e) => {
                    tracing::warn!(gpu_index = idx, error = %e, "Skipping GPU -- status query failed");
                }
            }
        }
        snapshots
    }

    fn collect_device(
        nvml: &Nvml,
        idx: u32,
    ) -> Result<GpuStatus, nvml_wrapper::error::NvmlError> {
        let device = nvml.device_by_index(idx)?;

        let mem_info = device.memory_info()?;
        let utilization = device.utilization_rates()?;

        Ok(GpuStatus {
            index: idx,
            name: device.name()?,
            uuid: device.uuid()?,
            utilization_percent: utilization.gpu,
            memory_used_mb: (mem_info.used / BYTES_PER_MB) as u32,
            memory_total_mb: (mem_info.total / BYTES_PER_MB) as u32,
            encoder_utilization_percent: device.encoder_utilization().ok().map(|u| u.utilization),
            decoder_utilization_percent: device.decoder_utilization().ok().map(|u| u.utilization),
        })
    }
}
