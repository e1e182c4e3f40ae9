// Audio loudness provider on top of the loopback_bands crate
use anyhow::Result;
use loopback_bands::{AnalyzerConfig, BandLevels, LoopbackCapture};

use crate::telemetry::{Gated, Provider};

/// Newest levels together with the device they came from
#[derive(Debug, Clone, PartialEq)]
pub struct AudioReading {
    pub source: String,
    pub levels: BandLevels,
}

/// Owns the running capture stream; dropping it stops capture
pub struct AudioMonitor {
    capture: LoopbackCapture,
}

impl AudioMonitor {
    /// Opens the default output in loopback mode, with one fallback backend
    pub fn probe(config: AnalyzerConfig) -> Result<Self> {
        let capture = loopback_bands::open_default(config)?;
        Ok(Self { capture })
    }
}

impl Provider for AudioMonitor {
    type Output = AudioReading;

    fn name(&self) -> &'static str {
        "Audio"
    }

    fn sample(&mut self) -> Option<AudioReading> {
        // A failed stream stays unavailable; the device is only reopened from the settings panel
        let levels = self.capture.levels()?;
        Some(AudioReading {
            source: self.capture.device_name().to_string(),
            levels,
        })
    }
}

pub type AudioProvider = Gated<Box<dyn Provider<Output = AudioReading>>>;

/// Probes the loopback device and boxes the result for the render loop
pub fn start_audio(config: AnalyzerConfig) -> AudioProvider {
    Gated::probe("Audio", || {
        AudioMonitor::probe(config).map(|m| Box::new(m) as Box<dyn Provider<Output = AudioReading>>)
    })
}
