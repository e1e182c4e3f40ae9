//! Formatting of a telemetry sample into the overlay's text block.
//!
//! The block always keeps the same line order. Sections that are switched off
//! (GPU without a usable driver, audio when disabled) are left out entirely;
//! values that failed to read are shown as `N/A`.

use std::time::Duration;

use loopback_bands::meter;

use crate::audio::AudioReading;
use crate::telemetry::{TelemetrySample, Usage};

/// Cells in each audio bar
pub const BAR_WIDTH: usize = 30;

pub const NOT_AVAILABLE: &str = "N/A";

/// Audio labels are padded to the longest one so the bars line up
const METER_LABEL_WIDTH: usize = "Audio Treble:".len();

#[derive(Debug, Clone, PartialEq)]
pub enum LineValue {
    Text(String),
    /// Audio level in 0.0..=1.0, drawn as a bar
    Level(f32),
    NotAvailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub label: &'static str,
    pub value: LineValue,
    padded: bool,
}

impl Line {
    pub fn stat(label: &'static str, value: Option<String>) -> Self {
        Self {
            label,
            value: value.map_or(LineValue::NotAvailable, LineValue::Text),
            padded: false,
        }
    }

    pub fn meter(label: &'static str, level: Option<f32>) -> Self {
        Self {
            label,
            value: level.map_or(LineValue::NotAvailable, LineValue::Level),
            padded: true,
        }
    }

    /// `"Label:"`, padded for meter lines
    pub fn label_text(&self) -> String {
        let label = format!("{}:", self.label);
        if self.padded {
            format!("{:<width$}", label, width = METER_LABEL_WIDTH)
        } else {
            label
        }
    }

    pub fn value_text(&self) -> String {
        match &self.value {
            LineValue::Text(text) => text.clone(),
            LineValue::Level(level) => meter(*level, BAR_WIDTH),
            LineValue::NotAvailable => NOT_AVAILABLE.to_string(),
        }
    }

    pub fn level(&self) -> Option<f32> {
        match self.value {
            LineValue::Level(level) => Some(level),
            _ => None,
        }
    }

    pub fn text(&self) -> String {
        format!("{} {}", self.label_text(), self.value_text())
    }
}

/// What the overlay currently shows, split so the audio sub-cycle can replace
/// its lines without touching the rest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub stats: Vec<Line>,
    pub audio: Vec<Line>,
}

impl TextBlock {
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.stats.iter().chain(self.audio.iter())
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.lines().map(|line| line.label).collect()
    }

    pub fn line_count(&self) -> usize {
        self.stats.len() + self.audio.len()
    }

    /// Characters in the longest line, used for size estimation
    pub fn longest_line(&self) -> usize {
        self.lines().map(|line| line.text().chars().count()).max().unwrap_or(0)
    }

    pub fn to_text(&self) -> String {
        self.lines().map(Line::text).collect::<Vec<_>>().join("\n")
    }
}

/// `3h 4m 5s`; hours keep counting past a day
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (hours, rem) = (secs / 3600, secs % 3600);
    format!("{}h {}m {}s", hours, rem / 60, rem % 60)
}

fn format_usage(usage: &Usage, unit: &str) -> String {
    format!("{:.1}% ({} / {} {})", usage.percent(), usage.used, usage.total, unit)
}

/// Everything except audio, in display order
pub fn stat_lines(sample: &TelemetrySample, show_gpu: bool) -> Vec<Line> {
    let mut lines = vec![
        Line::stat("OS", sample.os_name.clone()),
        Line::stat("Uptime", sample.uptime.map(format_uptime)),
        Line::stat("CPU Model", sample.cpu_model.clone()),
        Line::stat("CPU Usage", sample.cpu_usage.map(|u| format!("{:.1}%", u))),
        Line::stat("Memory Usage", sample.memory.map(|m| format_usage(&m, "MB"))),
        Line::stat("Disk Usage", sample.disk.map(|d| format_usage(&d, "GB"))),
    ];

    if show_gpu {
        let gpu = &sample.gpu;
        lines.extend([
            Line::stat("GPU", gpu.name.clone()),
            Line::stat("GPU Usage", gpu.utilization.map(|u| format!("{}%", u))),
            Line::stat("GPU Memory", gpu.memory.map(|m| format_usage(&m, "MB"))),
            Line::stat("GPU Temp", gpu.temperature.map(|t| format!("{}°C", t))),
        ]);
    }

    lines
}

/// The audio section; `None` means capture is enabled but unavailable
pub fn audio_lines(audio: Option<&AudioReading>) -> Vec<Line> {
    let levels = audio.map(|a| a.levels);
    vec![
        Line::stat("Audio Source", audio.map(|a| a.source.clone())),
        Line::meter("Audio Volume", levels.map(|l| l.volume)),
        Line::meter("Audio Bass", levels.map(|l| l.bass)),
        Line::meter("Audio Mid", levels.map(|l| l.mid)),
        Line::meter("Audio Treble", levels.map(|l| l.treble)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_data::GpuData;
    use loopback_bands::BandLevels;

    fn sample() -> TelemetrySample {
        TelemetrySample {
            os_name: Some("Windows 11 Pro".to_string()),
            uptime: Some(Duration::from_secs(3 * 3600 + 4 * 60 + 5)),
            cpu_model: Some("AMD Ryzen 7 5800X 8-Core Processor".to_string()),
            cpu_usage: Some(37.2),
            memory: Usage::new(6144, 16384),
            disk: Usage::new(120, 512),
            gpu: GpuData {
                name: Some("NVIDIA GeForce RTX 3070".to_string()),
                utilization: Some(54),
                memory: Usage::new(2048, 8192),
                temperature: Some(61),
            },
            audio: Some(AudioReading {
                source: "Speakers (Realtek Audio)".to_string(),
                levels: BandLevels {
                    volume: 0.42,
                    bass: 0.7,
                    mid: 0.3,
                    treble: 0.1,
                },
            }),
        }
    }

    fn block(sample: &TelemetrySample, show_gpu: bool, audio_enabled: bool) -> TextBlock {
        TextBlock {
            stats: stat_lines(sample, show_gpu),
            audio: if audio_enabled { audio_lines(sample.audio.as_ref()) } else { Vec::new() },
        }
    }

    #[test]
    fn test_full_block_formatting() {
        let text = block(&sample(), true, true).to_text();
        let expected = [
            "OS: Windows 11 Pro",
            "Uptime: 3h 4m 5s",
            "CPU Model: AMD Ryzen 7 5800X 8-Core Processor",
            "CPU Usage: 37.2%",
            "Memory Usage: 37.5% (6144 / 16384 MB)",
            "Disk Usage: 23.4% (120 / 512 GB)",
            "GPU: NVIDIA GeForce RTX 3070",
            "GPU Usage: 54%",
            "GPU Memory: 25.0% (2048 / 8192 MB)",
            "GPU Temp: 61°C",
            "Audio Source: Speakers (Realtek Audio)",
            "Audio Volume: |||||||||||||-----------------",
            "Audio Bass:   |||||||||||||||||||||---------",
            "Audio Mid:    |||||||||---------------------",
            "Audio Treble: |||---------------------------",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_unavailable_values_show_na() {
        let mut sample = sample();
        sample.cpu_usage = None;
        sample.gpu = GpuData::unavailable();
        sample.audio = None;
        let block = block(&sample, true, true);
        let text = block.to_text();
        assert!(text.contains("CPU Usage: N/A"));
        assert!(text.contains("GPU Temp: N/A"));
        assert!(text.contains("Audio Source: N/A"));
        assert!(text.contains("Audio Bass:   N/A"));
        assert_eq!(block.line_count(), 15);
    }

    #[test]
    fn test_disabled_sections_keep_order() {
        let full = block(&sample(), true, true).labels();
        let trimmed = block(&sample(), false, false).labels();
        assert_eq!(trimmed.len(), 6);
        let filtered: Vec<_> = full
            .iter()
            .copied()
            .filter(|label| !label.starts_with("GPU") && !label.starts_with("Audio"))
            .collect();
        assert_eq!(trimmed, filtered);
    }

    #[test]
    fn test_uptime_past_a_day() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0h 0m 0s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "25h 1m 1s");
    }

    #[test]
    fn test_levels_only_on_meter_lines() {
        let block = block(&sample(), false, true);
        let levels: Vec<_> = block.lines().filter_map(Line::level).collect();
        assert_eq!(levels, vec![0.42, 0.7, 0.3, 0.1]);
        // The CPU model line is longer than any meter line
        assert_eq!(block.longest_line(), 45);
    }
}
