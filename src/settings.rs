// This module defines the overlay configuration record and the validation rules
// for every key. The store (settings_store.rs) only ever changes a value through
// Settings::set, so a rejected value never replaces the previous one.

use std::fmt;

use loopback_bands::{AnalyzerConfig, Normalization};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Screen corner the text block is anchored to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Anchor {
    pub const ALL: [Anchor; 4] = [Anchor::TopLeft, Anchor::TopRight, Anchor::BottomLeft, Anchor::BottomRight];

    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::TopLeft => "top-left",
            Anchor::TopRight => "top-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomRight => "bottom-right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Anchor::ALL.into_iter().find(|a| a.as_str() == value.trim().to_ascii_lowercase())
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Anchor::TopRight | Anchor::BottomRight)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Anchor::BottomLeft | Anchor::BottomRight)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Justification of each line inside the block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Right,
}

impl TextAlign {
    pub const ALL: [TextAlign; 2] = [TextAlign::Left, TextAlign::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Right => "right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        TextAlign::ALL.into_iter().find(|a| a.as_str() == value.trim().to_ascii_lowercase())
    }
}

impl fmt::Display for TextAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every key understood in settings.json
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    FontFamily,
    FontSize,
    TextColor,
    UpdateInterval,
    AudioUpdateInterval,
    PauseOnForeground,
    Anchor,
    TextAlign,
    MarginX,
    MarginY,
    MonitorDevice,
    AudioEnabled,
    AudioNormalization,
    AudioVolumeGain,
    AudioBandGain,
    AudioSmoothing,
}

impl SettingKey {
    pub const ALL: [SettingKey; 16] = [
        SettingKey::FontFamily,
        SettingKey::FontSize,
        SettingKey::TextColor,
        SettingKey::UpdateInterval,
        SettingKey::AudioUpdateInterval,
        SettingKey::PauseOnForeground,
        SettingKey::Anchor,
        SettingKey::TextAlign,
        SettingKey::MarginX,
        SettingKey::MarginY,
        SettingKey::MonitorDevice,
        SettingKey::AudioEnabled,
        SettingKey::AudioNormalization,
        SettingKey::AudioVolumeGain,
        SettingKey::AudioBandGain,
        SettingKey::AudioSmoothing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::FontFamily => "font_family",
            SettingKey::FontSize => "font_size",
            SettingKey::TextColor => "text_color",
            SettingKey::UpdateInterval => "update_interval",
            SettingKey::AudioUpdateInterval => "audio_update_interval",
            SettingKey::PauseOnForeground => "pause_on_foreground",
            SettingKey::Anchor => "anchor",
            SettingKey::TextAlign => "text_align",
            SettingKey::MarginX => "margin_x",
            SettingKey::MarginY => "margin_y",
            SettingKey::MonitorDevice => "monitor_device",
            SettingKey::AudioEnabled => "audio_enabled",
            SettingKey::AudioNormalization => "audio_normalization",
            SettingKey::AudioVolumeGain => "audio_volume_gain",
            SettingKey::AudioBandGain => "audio_band_gain",
            SettingKey::AudioSmoothing => "audio_smoothing",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        SettingKey::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown setting '{0}'")]
    UnknownKey(String),
    #[error("Invalid value {value} for '{key}': expected {expected}")]
    InvalidValue {
        key: SettingKey,
        value: String,
        expected: &'static str,
    },
}

pub const FONT_SIZE_RANGE: (i64, i64) = (8, 48);
pub const UPDATE_INTERVAL_RANGE: (i64, i64) = (250, 10_000);
pub const AUDIO_INTERVAL_RANGE: (i64, i64) = (20, 1_000);
pub const MARGIN_RANGE: (i64, i64) = (0, 500);
pub const GAIN_RANGE: (f64, f64) = (0.1, 100.0);
pub const SMOOTHING_RANGE: (f64, f64) = (0.0, 0.95);

const NAMED_COLORS: [(&str, (u8, u8, u8)); 14] = [
    ("white", (255, 255, 255)),
    ("black", (0, 0, 0)),
    ("red", (255, 0, 0)),
    ("green", (0, 128, 0)),
    ("lime", (0, 255, 0)),
    ("blue", (0, 0, 255)),
    ("yellow", (255, 255, 0)),
    ("cyan", (0, 255, 255)),
    ("magenta", (255, 0, 255)),
    ("gray", (128, 128, 128)),
    ("grey", (128, 128, 128)),
    ("silver", (192, 192, 192)),
    ("orange", (255, 165, 0)),
    ("pink", (255, 192, 203)),
];

/// Parses `#rrggbb`, `#rgb` or a named color into RGB components
pub fn parse_color(value: &str) -> Option<(u8, u8, u8)> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return match hex.len() {
            6 => Some((
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
                Some((digit(0)?, digit(1)?, digit(2)?))
            }
            _ => None,
        };
    }
    let lower = value.to_ascii_lowercase();
    NAMED_COLORS.iter().find(|(name, _)| *name == lower).map(|(_, rgb)| *rgb)
}

/// The overlay configuration. Defaults cover every key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub font_family: String,
    pub font_size: u16,
    pub text_color: String,
    pub update_interval: u64,
    pub audio_update_interval: u64,
    pub pause_on_foreground: bool,
    pub anchor: Anchor,
    pub text_align: TextAlign,
    pub margin_x: i32,
    pub margin_y: i32,
    pub monitor_device: Option<String>,
    pub audio_enabled: bool,
    #[serde(serialize_with = "serialize_normalization")]
    pub audio_normalization: Normalization,
    pub audio_volume_gain: f32,
    pub audio_band_gain: f32,
    pub audio_smoothing: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_family: "Consolas".to_string(),
            font_size: 12,
            text_color: "white".to_string(),
            update_interval: 1000,
            audio_update_interval: 50,
            pause_on_foreground: true,
            anchor: Anchor::TopLeft,
            text_align: TextAlign::Left,
            margin_x: 12,
            margin_y: 12,
            monitor_device: None,
            audio_enabled: true,
            audio_normalization: Normalization::Fixed,
            audio_volume_gain: 10.0,
            audio_band_gain: 8.0,
            audio_smoothing: 0.6,
        }
    }
}

fn serialize_normalization<S: Serializer>(value: &Normalization, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_str())
}

impl Settings {
    /// Validates `value` for `key` and stores it. On error nothing changes.
    pub fn set(&mut self, key: SettingKey, value: &Value) -> Result<(), SettingsError> {
        let invalid = |expected: &'static str| SettingsError::InvalidValue {
            key,
            value: value.to_string(),
            expected,
        };

        match key {
            SettingKey::FontFamily => {
                let family = as_text(value).filter(|s| !s.is_empty()).ok_or_else(|| invalid("a font name"))?;
                self.font_family = family;
            }
            SettingKey::FontSize => {
                self.font_size = as_int_in(value, FONT_SIZE_RANGE).ok_or_else(|| invalid("an integer 8..=48"))? as u16;
            }
            SettingKey::TextColor => {
                let color = as_text(value)
                    .filter(|s| parse_color(s).is_some())
                    .ok_or_else(|| invalid("#rrggbb, #rgb or a color name"))?;
                self.text_color = color;
            }
            SettingKey::UpdateInterval => {
                self.update_interval =
                    as_int_in(value, UPDATE_INTERVAL_RANGE).ok_or_else(|| invalid("milliseconds 250..=10000"))? as u64;
            }
            SettingKey::AudioUpdateInterval => {
                self.audio_update_interval =
                    as_int_in(value, AUDIO_INTERVAL_RANGE).ok_or_else(|| invalid("milliseconds 20..=1000"))? as u64;
            }
            SettingKey::PauseOnForeground => {
                self.pause_on_foreground = as_bool(value).ok_or_else(|| invalid("true or false"))?;
            }
            SettingKey::Anchor => {
                self.anchor = as_text(value)
                    .and_then(|s| Anchor::parse(&s))
                    .ok_or_else(|| invalid("top-left, top-right, bottom-left or bottom-right"))?;
            }
            SettingKey::TextAlign => {
                self.text_align = as_text(value)
                    .and_then(|s| TextAlign::parse(&s))
                    .ok_or_else(|| invalid("left or right"))?;
            }
            SettingKey::MarginX => {
                self.margin_x = as_int_in(value, MARGIN_RANGE).ok_or_else(|| invalid("pixels 0..=500"))? as i32;
            }
            SettingKey::MarginY => {
                self.margin_y = as_int_in(value, MARGIN_RANGE).ok_or_else(|| invalid("pixels 0..=500"))? as i32;
            }
            SettingKey::MonitorDevice => {
                self.monitor_device = match value {
                    Value::Null => None,
                    other => Some(as_text(other).filter(|s| !s.is_empty()).ok_or_else(|| invalid("a monitor name or null"))?),
                };
            }
            SettingKey::AudioEnabled => {
                self.audio_enabled = as_bool(value).ok_or_else(|| invalid("true or false"))?;
            }
            SettingKey::AudioNormalization => {
                self.audio_normalization = as_text(value)
                    .and_then(|s| Normalization::parse(&s))
                    .ok_or_else(|| invalid("fixed or adaptive"))?;
            }
            SettingKey::AudioVolumeGain => {
                self.audio_volume_gain = as_float_in(value, GAIN_RANGE).ok_or_else(|| invalid("a number 0.1..=100"))? as f32;
            }
            SettingKey::AudioBandGain => {
                self.audio_band_gain = as_float_in(value, GAIN_RANGE).ok_or_else(|| invalid("a number 0.1..=100"))? as f32;
            }
            SettingKey::AudioSmoothing => {
                self.audio_smoothing =
                    as_float_in(value, SMOOTHING_RANGE).ok_or_else(|| invalid("a number 0.0..=0.95"))? as f32;
            }
        }
        Ok(())
    }

    /// Same as [`Settings::set`] but addressed by the JSON key name
    pub fn set_by_name(&mut self, key: &str, value: &Value) -> Result<(), SettingsError> {
        let key = SettingKey::parse(key).ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        self.set(key, value)
    }

    /// Current value of `key` as it would be written to settings.json
    pub fn get(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::FontFamily => Value::from(self.font_family.clone()),
            SettingKey::FontSize => Value::from(self.font_size),
            SettingKey::TextColor => Value::from(self.text_color.clone()),
            SettingKey::UpdateInterval => Value::from(self.update_interval),
            SettingKey::AudioUpdateInterval => Value::from(self.audio_update_interval),
            SettingKey::PauseOnForeground => Value::from(self.pause_on_foreground),
            SettingKey::Anchor => Value::from(self.anchor.as_str()),
            SettingKey::TextAlign => Value::from(self.text_align.as_str()),
            SettingKey::MarginX => Value::from(self.margin_x),
            SettingKey::MarginY => Value::from(self.margin_y),
            SettingKey::MonitorDevice => self.monitor_device.clone().map(Value::from).unwrap_or(Value::Null),
            SettingKey::AudioEnabled => Value::from(self.audio_enabled),
            SettingKey::AudioNormalization => Value::from(self.audio_normalization.as_str()),
            SettingKey::AudioVolumeGain => Value::from(self.audio_volume_gain),
            SettingKey::AudioBandGain => Value::from(self.audio_band_gain),
            SettingKey::AudioSmoothing => Value::from(self.audio_smoothing),
        }
    }

    /// Builds a configuration from a parsed settings object. Keys that are
    /// missing, unknown or invalid keep their defaults.
    pub fn from_json(value: &Value) -> Self {
        let mut settings = Settings::default();
        let Some(map) = value.as_object() else {
            log::warn!("Settings file is not a JSON object, using defaults");
            return settings;
        };
        for (name, value) in map {
            let Some(key) = SettingKey::parse(name) else {
                log::debug!("Ignoring unknown setting '{}'", name);
                continue;
            };
            // null means "use the default" for everything except the monitor choice
            if value.is_null() && key != SettingKey::MonitorDevice {
                continue;
            }
            if let Err(e) = settings.set(key, value) {
                log::warn!("{}, keeping default", e);
            }
        }
        settings
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            normalization: self.audio_normalization,
            volume_gain: self.audio_volume_gain,
            band_gain: self.audio_band_gain,
            smoothing: self.audio_smoothing,
        }
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

fn as_int_in(value: &Value, (min, max): (i64, i64)) -> Option<i64> {
    let n = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (min..=max).contains(&n).then_some(n)
}

fn as_float_in(value: &Value, (min, max): (f64, f64)) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
