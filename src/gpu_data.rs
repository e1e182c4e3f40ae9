use crate::telemetry::{Gated, Provider, Usage};

pub type GpuProvider = Gated<Box<dyn Provider<Output = GpuData>>>;

/// Readings for the monitored GPU (NVML device 0).
///
/// Every field is optional: a driver call that fails on one tick only blanks
/// that field, the others are still shown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuData {
    /// Model name as reported by the driver (e.g. "NVIDIA GeForce RTX 3080")
    pub name: Option<String>,

    /// Core utilization in percent (0-100)
    pub utilization: Option<u32>,

    /// VRAM used and total, in megabytes
    pub memory: Option<Usage>,

    /// Core temperature in Celsius
    pub temperature: Option<u32>,
}

impl GpuData {
    /// All fields unavailable, used when the GPU can't be read at all
    pub fn unavailable() -> Self {
        Self::default()
    }
}
