use std::str::FromStr;

use crate::types::{CaptureError, CaptureResult, DeviceInfo};

/// Name fragments used by drivers that expose the playback mix as a capture device
const LOOPBACK_NAME_HINTS: [&str; 5] = ["loopback", "stereo mix", "what u hear", "wave out", "monitor of"];

/// How the operator picked a device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// Default output endpoint, falling back to the first listed device
    #[default]
    Default,
    /// Position in the list printed by `list_devices`
    Index(usize),
    /// Case-insensitive fragment of the device name
    NameContains(String),
}

impl DeviceSelector {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            DeviceSelector::Default
        } else if let Ok(index) = value.parse::<usize>() {
            DeviceSelector::Index(index)
        } else {
            DeviceSelector::NameContains(value.to_lowercase())
        }
    }

    pub fn resolve<'a>(&self, devices: &'a [DeviceInfo]) -> CaptureResult<&'a DeviceInfo> {
        match self {
            DeviceSelector::Default => devices
                .iter()
                .find(|d| d.is_default)
                .or_else(|| devices.first())
                .ok_or(CaptureError::NoDevice),
            DeviceSelector::Index(index) => devices
                .iter()
                .find(|d| d.index == *index)
                .ok_or_else(|| CaptureError::NoMatchingDevice(index.to_string())),
            DeviceSelector::NameContains(fragment) => {
                let fragment = fragment.to_lowercase();
                devices
                    .iter()
                    .find(|d| d.name.to_lowercase().contains(&fragment))
                    .ok_or(CaptureError::NoMatchingDevice(fragment))
            }
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DeviceSelector::parse(s))
    }
}

/// True when a capture device name suggests it carries the system mix
pub fn is_loopback_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    LOOPBACK_NAME_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Strips driver decorations so the overlay shows a readable source name
pub fn display_name(name: &str) -> String {
    name.replace("[Loopback]", "").trim().to_string()
}
