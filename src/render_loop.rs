//! The periodic sample → format → display cycle.
//!
//! Two timers drive this: the main tick polls every provider, formats the
//! whole block and hands it to the display; the audio tick only samples audio
//! and replaces the audio lines. Both run synchronously on the event loop, so
//! a tick is always idle again by the time it returns. Both are
//! skipped while a fullscreen application has focus on the overlay's monitor
//! (when `pause_on_foreground` is set); the display then keeps its last block.

use log::debug;

use crate::audio::{AudioProvider, AudioReading};
use crate::foreground::{is_fullscreen_on, ForegroundProbe};
use crate::gpu_data::{GpuData, GpuProvider};
use crate::monitors::Monitor;
use crate::settings::Settings;
use crate::system_stats::SystemSource;
use crate::telemetry::{Budget, TelemetrySample};
use crate::text_block::{audio_lines, stat_lines, TextBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The block was rebuilt and should be shown
    Rendered,
    /// Nothing changed, the display keeps its last content
    Skipped,
}

/// Where the overlay currently lives, needed for the pause check
pub struct Screen<'a> {
    pub target: &'a Monitor,
    pub monitors: &'a [Monitor],
}

pub struct RenderLoop {
    system: Box<dyn SystemSource>,
    gpu: GpuProvider,
    audio: AudioProvider,
    foreground: Box<dyn ForegroundProbe>,
    budget: Budget,
    block: TextBlock,
}

impl RenderLoop {
    pub fn new(
        system: Box<dyn SystemSource>,
        gpu: GpuProvider,
        audio: AudioProvider,
        foreground: Box<dyn ForegroundProbe>,
        budget: Budget,
    ) -> Self {
        Self {
            system,
            gpu,
            audio,
            foreground,
            budget,
            block: TextBlock::default(),
        }
    }

    pub fn block(&self) -> &TextBlock {
        &self.block
    }

    pub fn gpu_capable(&self) -> bool {
        self.gpu.is_capable()
    }

    pub fn audio_capable(&self) -> bool {
        self.audio.is_capable()
    }

    /// Swaps the audio provider, dropping (and so stopping) the previous one
    pub fn set_audio(&mut self, audio: AudioProvider) {
        self.audio.release();
        self.audio = audio;
    }

    pub fn stop_audio(&mut self) {
        self.audio.release();
    }

    /// Releases the audio stream and the GPU session
    pub fn shutdown(&mut self) {
        self.audio.release();
        self.gpu.release();
    }

    fn should_pause(&self, settings: &Settings, screen: &Screen) -> bool {
        settings.pause_on_foreground
            && is_fullscreen_on(self.foreground.foreground_rect(), screen.target, screen.monitors)
    }

    /// One full cycle: poll everything, rebuild the block
    pub fn tick(&mut self, settings: &Settings, screen: &Screen) -> TickOutcome {
        if self.should_pause(settings, screen) {
            debug!("Fullscreen application focused, skipping tick");
            return TickOutcome::Skipped;
        }

        let sample = self.sample(settings);
        // Formatting; the display step is State redrawing from `block()`
        let block = TextBlock {
            stats: stat_lines(&sample, self.gpu.is_capable()),
            audio: if settings.audio_enabled {
                audio_lines(sample.audio.as_ref())
            } else {
                Vec::new()
            },
        };

        self.block = block;
        TickOutcome::Rendered
    }

    /// Audio-only cycle, replaces just the audio lines
    pub fn audio_tick(&mut self, settings: &Settings, screen: &Screen) -> TickOutcome {
        if !settings.audio_enabled {
            if self.block.audio.is_empty() {
                return TickOutcome::Skipped;
            }
            self.block.audio.clear();
            return TickOutcome::Rendered;
        }
        if self.should_pause(settings, screen) {
            return TickOutcome::Skipped;
        }

        let reading = self.sample_audio();
        self.block.audio = audio_lines(reading.as_ref());
        TickOutcome::Rendered
    }

    fn sample_audio(&mut self) -> Option<AudioReading> {
        self.audio.sample_within(self.budget)
    }

    fn sample(&mut self, settings: &Settings) -> TelemetrySample {
        let budget = self.budget;
        let system = &mut self.system;
        let os_name = budget.run("os_name", || system.os_name());
        let uptime = budget.run("uptime", || system.uptime());
        let cpu_model = budget.run("cpu_model", || system.cpu_model());
        let cpu_usage = budget.run("cpu_usage", || system.cpu_usage());
        let memory = budget.run("memory", || system.memory());
        let disk = budget.run("disk", || system.disk());
        let gpu = self.gpu.sample_within(budget).unwrap_or_else(GpuData::unavailable);
        let audio = if settings.audio_enabled { self.sample_audio() } else { None };

        TelemetrySample {
            os_name,
            uptime,
            cpu_model,
            cpu_usage,
            memory,
            disk,
            gpu,
            audio,
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::Rect;
    use crate::telemetry::{Gated, Provider, Usage};
    use loopback_bands::BandLevels;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    struct FakeSystem {
        slow_disk: bool,
    }

    impl SystemSource for FakeSystem {
        fn os_name(&mut self) -> Option<String> {
            Some("Windows 11 Pro".to_string())
        }
        fn uptime(&mut self) -> Option<Duration> {
            Some(Duration::from_secs(61))
        }
        fn cpu_model(&mut self) -> Option<String> {
            Some("Test CPU".to_string())
        }
        fn cpu_usage(&mut self) -> Option<f32> {
            Some(12.5)
        }
        fn memory(&mut self) -> Option<Usage> {
            Usage::new(1024, 4096)
        }
        fn disk(&mut self) -> Option<Usage> {
            if self.slow_disk {
                std::thread::sleep(Duration::from_millis(40));
            }
            Usage::new(100, 200)
        }
    }

    struct FakeGpu;

    impl Provider for FakeGpu {
        type Output = GpuData;
        fn name(&self) -> &'static str {
            "GPU"
        }
        fn sample(&mut self) -> Option<GpuData> {
            Some(GpuData {
                name: Some("Test GPU".to_string()),
                utilization: Some(54),
                memory: Usage::new(2048, 8192),
                temperature: Some(61),
            })
        }
    }

    struct FakeAudio {
        calls: Rc<Cell<u32>>,
    }

    impl Provider for FakeAudio {
        type Output = AudioReading;
        fn name(&self) -> &'static str {
            "Audio"
        }
        fn sample(&mut self) -> Option<AudioReading> {
            self.calls.set(self.calls.get() + 1);
            Some(AudioReading {
                source: "Speakers".to_string(),
                levels: BandLevels {
                    volume: 0.5,
                    ..BandLevels::default()
                },
            })
        }
    }

    struct FakeForeground(Rc<Cell<Option<Rect>>>);

    impl ForegroundProbe for FakeForeground {
        fn foreground_rect(&self) -> Option<Rect> {
            self.0.get()
        }
    }

    struct Harness {
        render: RenderLoop,
        foreground: Rc<Cell<Option<Rect>>>,
        audio_calls: Rc<Cell<u32>>,
        monitors: Vec<Monitor>,
    }

    fn harness(gpu_capable: bool, slow_disk: bool) -> Harness {
        let foreground = Rc::new(Cell::new(None));
        let audio_calls = Rc::new(Cell::new(0));
        let gpu: GpuProvider = if gpu_capable {
            Gated::probe("GPU", || Ok(Box::new(FakeGpu) as Box<dyn Provider<Output = GpuData>>))
        } else {
            Gated::probe("GPU", || anyhow::bail!("no NVML"))
        };
        let calls = audio_calls.clone();
        let audio: AudioProvider = Gated::probe("Audio", move || {
            Ok(Box::new(FakeAudio { calls }) as Box<dyn Provider<Output = AudioReading>>)
        });
        let render = RenderLoop::new(
            Box::new(FakeSystem { slow_disk }),
            gpu,
            audio,
            Box::new(FakeForeground(foreground.clone())),
            Budget::new(Duration::from_millis(20)),
        );
        let monitors = vec![Monitor {
            name: "DISPLAY1".to_string(),
            bounds: Rect::new(0, 0, 1920, 1080),
            work_area: Rect::new(0, 0, 1920, 1040),
            primary: true,
            dpi: 96,
        }];
        Harness {
            render,
            foreground,
            audio_calls,
            monitors,
        }
    }

    impl Harness {
        fn tick(&mut self, settings: &Settings) -> TickOutcome {
            let screen = Screen {
                target: &self.monitors[0],
                monitors: &self.monitors,
            };
            self.render.tick(settings, &screen)
        }

        fn audio_tick(&mut self, settings: &Settings) -> TickOutcome {
            let screen = Screen {
                target: &self.monitors[0],
                monitors: &self.monitors,
            };
            self.render.audio_tick(settings, &screen)
        }
    }

    #[test]
    fn test_tick_renders_full_block() {
        let mut h = harness(true, false);
        assert_eq!(h.tick(&Settings::default()), TickOutcome::Rendered);
        assert_eq!(h.render.block().line_count(), 15);
        assert!(h.render.block().to_text().contains("GPU Temp: 61°C"));
    }

    #[test]
    fn test_failed_gpu_probe_hides_gpu_lines_every_tick() {
        let mut h = harness(false, false);
        assert!(!h.render.gpu_capable());
        for _ in 0..3 {
            h.tick(&Settings::default());
            assert!(h.render.block().labels().iter().all(|l| !l.starts_with("GPU")));
            let sample = h.render.sample(&Settings::default());
            assert_eq!(sample.gpu, GpuData::unavailable());
        }
    }

    #[test]
    fn test_disabling_audio_removes_audio_lines_only() {
        let mut h = harness(true, false);
        let mut settings = Settings::default();
        h.tick(&settings);
        let before = h.render.block().labels();

        settings.audio_enabled = false;
        h.tick(&settings);
        let after = h.render.block().labels();
        let expected: Vec<_> = before.into_iter().filter(|l| !l.starts_with("Audio")).collect();
        assert_eq!(after, expected);
    }

    #[test]
    fn test_fullscreen_pauses_both_cycles() {
        let mut h = harness(true, false);
        let settings = Settings::default();
        h.tick(&settings);
        let shown = h.render.block().clone();
        let calls = h.audio_calls.get();

        h.foreground.set(Some(Rect::new(0, 0, 1920, 1080)));
        assert_eq!(h.tick(&settings), TickOutcome::Skipped);
        assert_eq!(h.audio_tick(&settings), TickOutcome::Skipped);
        assert_eq!(h.render.block(), &shown);
        assert_eq!(h.audio_calls.get(), calls);

        h.foreground.set(None);
        assert_eq!(h.tick(&settings), TickOutcome::Rendered);
    }

    #[test]
    fn test_pause_disabled_ignores_fullscreen() {
        let mut h = harness(true, false);
        let settings = Settings {
            pause_on_foreground: false,
            ..Settings::default()
        };
        h.foreground.set(Some(Rect::new(0, 0, 1920, 1080)));
        assert_eq!(h.tick(&settings), TickOutcome::Rendered);
    }

    #[test]
    fn test_audio_tick_only_touches_audio_lines() {
        let mut h = harness(true, false);
        let settings = Settings::default();
        h.tick(&settings);
        let stats = h.render.block().stats.clone();
        assert_eq!(h.audio_tick(&settings), TickOutcome::Rendered);
        assert_eq!(h.render.block().stats, stats);
        assert_eq!(h.render.block().audio.len(), 5);
    }

    #[test]
    fn test_audio_tick_when_disabled() {
        let mut h = harness(true, false);
        let mut settings = Settings::default();
        h.tick(&settings);
        settings.audio_enabled = false;
        let calls = h.audio_calls.get();
        assert_eq!(h.audio_tick(&settings), TickOutcome::Rendered);
        assert!(h.render.block().audio.is_empty());
        assert_eq!(h.audio_tick(&settings), TickOutcome::Skipped);
        assert_eq!(h.audio_calls.get(), calls);
    }

    #[test]
    fn test_slow_provider_is_unavailable_for_that_tick() {
        let mut h = harness(true, true);
        h.tick(&Settings::default());
        let text = h.render.block().to_text();
        assert!(text.contains("Disk Usage: N/A"));
        assert!(text.contains("Memory Usage: 25.0% (1024 / 4096 MB)"));
    }

    #[test]
    fn test_stopped_audio_shows_na() {
        let mut h = harness(true, false);
        h.render.stop_audio();
        assert!(!h.render.audio_capable());
        h.tick(&Settings::default());
        assert!(h.render.block().to_text().contains("Audio Source: N/A"));
    }

    #[test]
    fn test_shutdown_releases_providers() {
        let mut h = harness(true, false);
        h.render.shutdown();
        assert!(!h.render.gpu_capable());
        assert!(!h.render.audio_capable());
    }
}
