// NVIDIA GPU readings through NVML, the library behind nvidia-smi
use crate::gpu_data::{GpuData, GpuProvider};
use crate::telemetry::{Gated, Provider, Usage};
use anyhow::{Context, Result};
use log::{debug, info};
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Only the first device is monitored
const DEVICE_INDEX: u32 = 0;

/// Holds an initialized NVML session for the lifetime of the overlay.
///
/// NVML is initialized once by [`NvmlMonitor::probe`]. Dropping the monitor
/// shuts the session down, so the handle never outlives the process state
/// that owns it.
pub struct NvmlMonitor {
    nvml: Nvml,
    name: Option<String>,
}

impl NvmlMonitor {
    /// Initializes NVML and checks that device 0 answers.
    /// Fails when there is no NVIDIA driver or no NVIDIA GPU.
    pub fn probe() -> Result<Self> {
        let nvml = Nvml::init().context("NVML initialization failed")?;
        let name = {
            let device = nvml
                .device_by_index(DEVICE_INDEX)
                .context("NVML has no device 0")?;
            device.name().ok()
        };
        info!("NVML ready, monitoring {}", name.as_deref().unwrap_or("unnamed GPU"));
        Ok(Self { nvml, name })
    }

    fn read(&self) -> Option<GpuData> {
        let device = match self.nvml.device_by_index(DEVICE_INDEX) {
            Ok(device) => device,
            Err(e) => {
                debug!("NVML device {} unavailable: {}", DEVICE_INDEX, e);
                return None;
            }
        };

        // Each field fails independently, e.g. temperature is missing on some laptops
        let utilization = device.utilization_rates().ok().map(|u| u.gpu.min(100));
        let memory = device
            .memory_info()
            .ok()
            .and_then(|m| Usage::new(m.used / BYTES_PER_MB, m.total / BYTES_PER_MB));
        let temperature = device.temperature(TemperatureSensor::Gpu).ok();

        Some(GpuData {
            name: self.name.clone(),
            utilization,
            memory,
            temperature,
        })
    }
}

/// Probes NVML once; without an NVIDIA driver the GPU block stays hidden
pub fn start_gpu() -> GpuProvider {
    Gated::probe("GPU", || NvmlMonitor::probe().map(|m| Box::new(m) as Box<dyn Provider<Output = GpuData>>))
}

impl Provider for NvmlMonitor {
    type Output = GpuData;

    fn name(&self) -> &'static str {
        "GPU"
    }

    fn sample(&mut self) -> Option<GpuData> {
        self.read()
    }
}

impl Drop for NvmlMonitor {
    fn drop(&mut self) {
        // Nvml's own Drop calls nvmlShutdown
        debug!("Shutting down NVML");
    }
}

