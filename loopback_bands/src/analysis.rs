//! Spectral split of a mono frame into volume, bass, mid and treble levels.
//!
//! Every frame is Hann windowed, transformed with a forward FFT, and the power of
//! each band is expressed as a share of the total power. Volume is the RMS of the
//! windowed frame. Both are mapped to 0.0..=1.0 according to the configured
//! [`Normalization`] and then exponentially smoothed.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::types::{AnalyzerConfig, BandLevels, Normalization};

/// Samples per analysed frame
pub const FRAME_SIZE: usize = 2048;

pub const BASS_HZ: (f32, f32) = (20.0, 250.0);
pub const MID_HZ: (f32, f32) = (250.0, 2000.0);
pub const TREBLE_HZ: (f32, f32) = (2000.0, 16000.0);

// Adaptive mode: peaks lose 0.5% per frame and never fall below these floors,
// otherwise background hiss would be stretched to full scale.
const PEAK_DECAY: f32 = 0.995;
const VOLUME_PEAK_FLOOR: f32 = 0.01;
const BAND_PEAK_FLOOR: f32 = 0.05;

pub struct BandAnalyzer {
    config: AnalyzerConfig,
    sample_rate: u32,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    pending: Vec<f32>,
    levels: BandLevels,
    peaks: BandLevels,
}

impl BandAnalyzer {
    pub fn new(sample_rate: u32, config: AnalyzerConfig) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(FRAME_SIZE);
        Self {
            config,
            sample_rate: sample_rate.max(1),
            window: hann_window(FRAME_SIZE),
            fft,
            buffer: vec![Complex::new(0.0, 0.0); FRAME_SIZE],
            pending: Vec::with_capacity(FRAME_SIZE),
            levels: BandLevels::default(),
            peaks: BandLevels::default(),
        }
    }

    pub fn config(&self) -> AnalyzerConfig {
        self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Latest smoothed levels
    pub fn levels(&self) -> BandLevels {
        self.levels
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.levels = BandLevels::default();
        self.peaks = BandLevels::default();
    }

    /// Feeds interleaved samples, averaging channels down to mono.
    /// Returns true when at least one complete frame was analysed.
    pub fn push_interleaved(&mut self, samples: &[f32], channels: usize) -> bool {
        let channels = channels.max(1);
        let mut analysed = false;
        for frame in samples.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            self.pending.push(mono);
            if self.pending.len() == FRAME_SIZE {
                let frame = std::mem::take(&mut self.pending);
                self.process_frame(&frame);
                self.pending = frame;
                self.pending.clear();
                analysed = true;
            }
        }
        analysed
    }

    /// Analyses one frame of exactly [`FRAME_SIZE`] mono samples and returns the
    /// updated smoothed levels. Shorter input is zero padded, longer is truncated.
    pub fn process_frame(&mut self, frame: &[f32]) -> BandLevels {
        let raw = self.measure(frame);
        let target = self.normalize(raw);
        let s = self.config.smoothing.clamp(0.0, 0.99);
        let prev = self.levels.as_array();
        let next = target.as_array();
        let mut smoothed = [0.0f32; 4];
        for i in 0..4 {
            smoothed[i] = s * prev[i] + (1.0 - s) * next[i];
        }
        self.levels = BandLevels::from_array(smoothed);
        self.levels
    }

    /// Raw measurement: RMS volume and band power shares, all unscaled
    fn measure(&mut self, frame: &[f32]) -> BandLevels {
        let mut sum_sq = 0.0f32;
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = frame.get(i).copied().unwrap_or(0.0) * self.window[i];
            sum_sq += sample * sample;
            *slot = Complex::new(sample, 0.0);
        }
        let rms = (sum_sq / FRAME_SIZE as f32).sqrt();

        self.fft.process(&mut self.buffer);

        let bin_hz = self.sample_rate as f32 / FRAME_SIZE as f32;
        let (mut bass, mut mid, mut treble, mut total) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        // Only the non-negative half carries distinct information for real input
        for (k, bin) in self.buffer.iter().take(FRAME_SIZE / 2 + 1).enumerate() {
            let power = bin.norm_sqr();
            let freq = k as f32 * bin_hz;
            total += power;
            if in_band(freq, BASS_HZ) {
                bass += power;
            } else if in_band(freq, MID_HZ) {
                mid += power;
            } else if in_band(freq, TREBLE_HZ) {
                treble += power;
            }
        }
        let total = if total > 0.0 { total } else { 1.0 };

        BandLevels {
            volume: rms,
            bass: bass / total,
            mid: mid / total,
            treble: treble / total,
        }
    }

    fn normalize(&mut self, raw: BandLevels) -> BandLevels {
        match self.config.normalization {
            Normalization::Fixed => BandLevels {
                volume: (raw.volume * self.config.volume_gain).clamp(0.0, 1.0),
                bass: (raw.bass * self.config.band_gain).clamp(0.0, 1.0),
                mid: (raw.mid * self.config.band_gain).clamp(0.0, 1.0),
                treble: (raw.treble * self.config.band_gain).clamp(0.0, 1.0),
            },
            Normalization::Adaptive => {
                let raw = raw.as_array();
                let mut peaks = self.peaks.as_array();
                let mut out = [0.0f32; 4];
                for i in 0..4 {
                    let floor = if i == 0 { VOLUME_PEAK_FLOOR } else { BAND_PEAK_FLOOR };
                    peaks[i] = (peaks[i] * PEAK_DECAY).max(raw[i]).max(floor);
                    out[i] = (raw[i] / peaks[i]).clamp(0.0, 1.0);
                }
                self.peaks = BandLevels::from_array(peaks);
                BandLevels::from_array(out)
            }
        }
    }
}

fn in_band(freq: f32, (lo, hi): (f32, f32)) -> bool {
    freq >= lo && freq < hi
}

/// Symmetric Hann window
fn hann_window(len: usize) -> Vec<f32> {
    if len < 2 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f32;
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / denom).cos())
        .collect()
}
