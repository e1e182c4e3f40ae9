//! Loopback audio capture and loudness band analysis
//!
//! This crate captures what the system is currently playing (WASAPI loopback on
//! Windows) and reduces it to four display levels: overall volume plus bass, mid
//! and treble energy. Capture is only available on Windows; on other platforms
//! device listing is empty and opening a stream reports
//! [`CaptureError::Unsupported`], while the analysis half works everywhere.

pub use crate::analysis::{BandAnalyzer, FRAME_SIZE};
pub use crate::capture::{list_devices, open, open_default, LoopbackCapture, STALE_AFTER};
pub use crate::device::{display_name, is_loopback_name, DeviceSelector};
pub use crate::types::*;

mod analysis;
mod capture;
mod device;
mod types;
