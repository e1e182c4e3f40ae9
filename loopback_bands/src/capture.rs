//! Loopback capture backends.
//!
//! The primary path captures the default render endpoint in WASAPI loopback mode.
//! When that endpoint is missing or refuses a loopback stream, one fallback is
//! tried: the first capture endpoint whose name marks it as the playback mix
//! (for example "Stereo Mix"). Analysis runs inside the backend callback and the
//! newest levels are published into a shared slot read by [`LoopbackCapture::levels`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::device::DeviceSelector;
use crate::types::{AnalyzerConfig, Backend, BandLevels, CaptureResult, DeviceInfo};

#[cfg(windows)]
use crate::types::CaptureError;

/// Loopback endpoints deliver no packets while nothing plays, so levels older
/// than this read as silence rather than as the last loud frame.
pub const STALE_AFTER: Duration = Duration::from_millis(500);

/// What the capture callback last published
#[derive(Debug, Clone, Copy, Default)]
struct Published {
    levels: BandLevels,
    at: Option<Instant>,
    // Set by the stream error callback; the stream doesn't recover
    failed: bool,
}

impl Published {
    fn read(&self, now: Instant) -> Option<BandLevels> {
        if self.failed {
            return None;
        }
        match self.at {
            Some(at) if now.saturating_duration_since(at) <= STALE_AFTER => Some(self.levels),
            _ => Some(BandLevels::default()),
        }
    }
}

type LevelSlot = Arc<Mutex<Published>>;

fn with_slot<T>(slot: &LevelSlot, f: impl FnOnce(&mut Published) -> T) -> T {
    match slot.lock() {
        Ok(mut published) => f(&mut published),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}

/// A running loopback stream. Dropping it stops capture and releases the device.
pub struct LoopbackCapture {
    #[cfg(windows)]
    _stream: cpal::Stream,
    device_name: String,
    backend: Backend,
    levels: LevelSlot,
}

impl LoopbackCapture {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Newest smoothed levels published by the capture callback.
    /// `None` once the stream has failed (device unplugged, endpoint reset).
    pub fn levels(&self) -> Option<BandLevels> {
        with_slot(&self.levels, |published| published.read(Instant::now()))
    }
}

impl Drop for LoopbackCapture {
    fn drop(&mut self) {
        log::debug!("Releasing loopback capture on '{}'", self.device_name);
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
fn publish(slot: &LevelSlot, levels: BandLevels) {
    with_slot(slot, |published| {
        published.levels = levels;
        published.at = Some(Instant::now());
    });
}

#[cfg_attr(not(windows), allow(dead_code))]
fn mark_failed(slot: &LevelSlot) {
    with_slot(slot, |published| published.failed = true);
}

#[cfg(windows)]
mod backend {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SampleFormat, SizedSample};
    use log::{debug, info, warn};

    use crate::analysis::BandAnalyzer;
    use crate::device::{display_name, is_loopback_name};

    struct Candidate {
        info: DeviceInfo,
        device: cpal::Device,
    }

    fn enumerate() -> CaptureResult<Vec<Candidate>> {
        let host = cpal::default_host();
        let default_output = host
            .default_output_device()
            .and_then(|d| d.name().ok());

        let mut candidates = Vec::new();
        let outputs = host
            .output_devices()
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        for device in outputs {
            let Ok(name) = device.name() else { continue };
            let is_default = default_output.as_deref() == Some(name.as_str());
            candidates.push(Candidate {
                info: DeviceInfo {
                    index: candidates.len(),
                    name,
                    backend: Backend::OutputLoopback,
                    is_default,
                },
                device,
            });
        }

        match host.input_devices() {
            Ok(inputs) => {
                for device in inputs {
                    let Ok(name) = device.name() else { continue };
                    if !is_loopback_name(&name) {
                        continue;
                    }
                    candidates.push(Candidate {
                        info: DeviceInfo {
                            index: candidates.len(),
                            name,
                            backend: Backend::LoopbackInput,
                            is_default: false,
                        },
                        device,
                    });
                }
            }
            Err(e) => warn!("Failed to enumerate capture devices: {}", e),
        }

        Ok(candidates)
    }

    pub fn list_devices() -> CaptureResult<Vec<DeviceInfo>> {
        Ok(enumerate()?.into_iter().map(|c| c.info).collect())
    }

    pub fn open(selector: &DeviceSelector, config: AnalyzerConfig) -> CaptureResult<LoopbackCapture> {
        let candidates = enumerate()?;
        let infos: Vec<DeviceInfo> = candidates.iter().map(|c| c.info.clone()).collect();
        let chosen = selector.resolve(&infos)?;
        let candidate = &candidates[chosen.index];
        start(candidate, config)
    }

    pub fn open_default(config: AnalyzerConfig) -> CaptureResult<LoopbackCapture> {
        let candidates = enumerate()?;

        // Primary: loopback on the default render endpoint
        if let Some(primary) = candidates
            .iter()
            .find(|c| c.info.backend == Backend::OutputLoopback && c.info.is_default)
        {
            match start(primary, config) {
                Ok(capture) => return Ok(capture),
                Err(e) => warn!("Loopback on '{}' failed: {}", primary.info.name, e),
            }
        } else {
            debug!("No default output endpoint for loopback capture");
        }

        // Fallback: a capture endpoint that carries the mix
        if let Some(fallback) = candidates.iter().find(|c| c.info.backend == Backend::LoopbackInput) {
            info!("Falling back to loopback input '{}'", fallback.info.name);
            return start(fallback, config);
        }

        Err(CaptureError::NoDevice)
    }

    fn start(candidate: &Candidate, config: AnalyzerConfig) -> CaptureResult<LoopbackCapture> {
        let supported = match candidate.info.backend {
            Backend::OutputLoopback => candidate.device.default_output_config(),
            Backend::LoopbackInput => candidate.device.default_input_config(),
        }
        .map_err(|e| CaptureError::Backend(e.to_string()))?;

        let sample_format = supported.sample_format();
        let stream_config = supported.config();
        let levels: LevelSlot = Arc::default();

        let stream = match sample_format {
            SampleFormat::F32 => build::<f32>(&candidate.device, &stream_config, levels.clone(), config)?,
            SampleFormat::I16 => build::<i16>(&candidate.device, &stream_config, levels.clone(), config)?,
            SampleFormat::U16 => build::<u16>(&candidate.device, &stream_config, levels.clone(), config)?,
            SampleFormat::I32 => build::<i32>(&candidate.device, &stream_config, levels.clone(), config)?,
            other => return Err(CaptureError::UnsupportedFormat(format!("{:?}", other))),
        };
        stream.play().map_err(|e| CaptureError::Backend(e.to_string()))?;

        info!(
            "Loopback capture started on '{}' ({}, {} Hz, {} ch)",
            candidate.info.name, candidate.info.backend, stream_config.sample_rate.0, stream_config.channels
        );

        Ok(LoopbackCapture {
            _stream: stream,
            device_name: display_name(&candidate.info.name),
            backend: candidate.info.backend,
            levels,
        })
    }

    fn build<T>(
        device: &cpal::Device,
        stream_config: &cpal::StreamConfig,
        levels: LevelSlot,
        config: AnalyzerConfig,
    ) -> CaptureResult<cpal::Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let channels = stream_config.channels as usize;
        let mut analyzer = BandAnalyzer::new(stream_config.sample_rate.0, config);
        let mut converted: Vec<f32> = Vec::new();
        let error_slot = levels.clone();

        device
            .build_input_stream(
                stream_config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    converted.clear();
                    converted.extend(data.iter().map(|s| f32::from_sample(*s)));
                    if analyzer.push_interleaved(&converted, channels) {
                        publish(&levels, analyzer.levels());
                    }
                },
                move |err| {
                    warn!("Loopback stream error: {}", err);
                    mark_failed(&error_slot);
                },
                None,
            )
            .map_err(|e| CaptureError::Backend(e.to_string()))
    }
}

#[cfg(not(windows))]
mod backend {
    use super::*;
    use crate::types::CaptureError;

    pub fn list_devices() -> CaptureResult<Vec<DeviceInfo>> {
        Ok(Vec::new())
    }

    pub fn open(_selector: &DeviceSelector, _config: AnalyzerConfig) -> CaptureResult<LoopbackCapture> {
        Err(CaptureError::Unsupported)
    }

    pub fn open_default(_config: AnalyzerConfig) -> CaptureResult<LoopbackCapture> {
        Err(CaptureError::Unsupported)
    }
}

/// Devices usable for loopback capture, numbered for [`DeviceSelector::Index`]
pub fn list_devices() -> CaptureResult<Vec<DeviceInfo>> {
    backend::list_devices()
}

/// Opens the device picked by `selector`
pub fn open(selector: &DeviceSelector, config: AnalyzerConfig) -> CaptureResult<LoopbackCapture> {
    backend::open(selector, config)
}

/// Opens the default output in loopback mode, trying one fallback backend
pub fn open_default(config: AnalyzerConfig) -> CaptureResult<LoopbackCapture> {
    backend::open_default(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(slot: &LevelSlot) -> Published {
        with_slot(slot, |published| *published)
    }

    #[test]
    fn test_fresh_levels_are_reported() {
        let slot = LevelSlot::default();
        let levels = BandLevels::from_array([0.5, 0.7, 0.3, 0.1]);
        publish(&slot, levels);
        let published = snapshot(&slot);
        let at = published.at.unwrap();
        assert_eq!(published.read(at), Some(levels));
        assert_eq!(published.read(at + STALE_AFTER), Some(levels));
    }

    #[test]
    fn test_stale_levels_read_as_silence() {
        let slot = LevelSlot::default();
        // Nothing published yet
        assert_eq!(snapshot(&slot).read(Instant::now()), Some(BandLevels::default()));

        publish(&slot, BandLevels::from_array([0.9, 0.9, 0.9, 0.9]));
        let published = snapshot(&slot);
        let later = published.at.unwrap() + STALE_AFTER * 2;
        assert_eq!(published.read(later), Some(BandLevels::default()));
    }

    #[test]
    fn test_stream_error_makes_levels_unavailable() {
        let slot = LevelSlot::default();
        publish(&slot, BandLevels::from_array([0.5, 0.5, 0.5, 0.5]));
        mark_failed(&slot);
        let published = snapshot(&slot);
        assert_eq!(published.read(published.at.unwrap()), None);

        // A late callback doesn't bring the stream back
        publish(&slot, BandLevels::from_array([0.5, 0.5, 0.5, 0.5]));
        assert_eq!(snapshot(&slot).read(Instant::now()), None);
    }
}
