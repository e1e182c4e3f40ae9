use std::fmt;

/// Smoothed loudness levels, each in the 0.0..=1.0 display range
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandLevels {
    /// Overall loudness (RMS based)
    pub volume: f32,
    /// 20 - 250 Hz share of spectral power
    pub bass: f32,
    /// 250 - 2000 Hz share of spectral power
    pub mid: f32,
    /// 2000 - 16000 Hz share of spectral power
    pub treble: f32,
}

impl BandLevels {
    pub fn as_array(&self) -> [f32; 4] {
        [self.volume, self.bass, self.mid, self.treble]
    }

    pub fn from_array(values: [f32; 4]) -> Self {
        Self {
            volume: values[0],
            bass: values[1],
            mid: values[2],
            treble: values[3],
        }
    }
}

/// Text meter of `width` cells: `|` for the filled part, `-` for the rest.
/// The filled count is `round(level * width)` with `level` clamped to 0.0..=1.0.
pub fn meter(level: f32, width: usize) -> String {
    let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };
    let filled = ((level * width as f32).round() as usize).min(width);
    let mut bar = String::with_capacity(width);
    bar.extend(std::iter::repeat('|').take(filled));
    bar.extend(std::iter::repeat('-').take(width - filled));
    bar
}

/// How raw measurements are mapped into the display range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Normalization {
    /// Multiply by the configured gains and clamp
    #[default]
    Fixed,
    /// Divide by a slowly decaying per-device peak
    Adaptive,
}

impl Normalization {
    pub const ALL: [Normalization; 2] = [Normalization::Fixed, Normalization::Adaptive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Normalization::Fixed => "fixed",
            Normalization::Adaptive => "adaptive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(Normalization::Fixed),
            "adaptive" => Some(Normalization::Adaptive),
            _ => None,
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning for [`crate::BandAnalyzer`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    pub normalization: Normalization,
    /// Gain applied to RMS volume in fixed mode
    pub volume_gain: f32,
    /// Gain applied to band power shares in fixed mode
    pub band_gain: f32,
    /// Weight of the previous level, 0.0 disables smoothing
    pub smoothing: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            normalization: Normalization::Fixed,
            volume_gain: 10.0,
            band_gain: 8.0,
            smoothing: 0.6,
        }
    }
}

/// Which capture path produced a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Render endpoint captured in loopback mode
    OutputLoopback,
    /// Capture endpoint that exposes the mix itself ("Stereo Mix" and friends)
    LoopbackInput,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::OutputLoopback => write!(f, "output loopback"),
            Backend::LoopbackInput => write!(f, "loopback input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub backend: Backend,
    pub is_default: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No loopback device matches '{0}'")]
    NoMatchingDevice(String),
    #[error("No loopback capture device available")]
    NoDevice,
    #[error("Audio backend error: {0}")]
    Backend(String),
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
    #[error("Loopback capture is not supported on this platform")]
    Unsupported,
}

pub type CaptureResult<T> = Result<T, CaptureError>;
