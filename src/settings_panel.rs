//! The settings window.
//!
//! Edits go into a draft; nothing reaches the store until Save. Save hands
//! every field to [`crate::settings_store::SettingsStore::apply_all`], so the
//! panel uses the same validation as the settings file. Rejected fields are
//! listed under the form and keep their previous value.

use iced::widget::{button, checkbox, column, combo_box, container, pick_list, row, text, text_input};
use iced::{Alignment, Element, Length};
use serde_json::Value;

use crate::monitors::Monitor;
use crate::settings::{Anchor, SettingKey, Settings, SettingsError, TextAlign};
use crate::styles;

const LABEL_WIDTH: f32 = 200.0;

/// Family names of every font the text renderer can use, sorted and unique.
/// Includes the system fonts iced loads at startup.
pub fn installed_families() -> Vec<String> {
    let font_system = iced::advanced::graphics::text::font_system();
    let mut guard = match font_system.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let names = guard
        .raw()
        .db()
        .faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
        .collect::<Vec<_>>();
    family_list(names)
}

/// The configured family stays selectable even if it isn't installed
fn font_choices(configured: &str, mut fonts: Vec<String>) -> Vec<String> {
    if !fonts.iter().any(|name| name == configured) {
        fonts.insert(0, configured.to_string());
    }
    fonts
}

fn family_list(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut families: Vec<String> = names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    families.sort_by_key(|name| name.to_lowercase());
    families.dedup();
    families
}

#[derive(Debug, Clone)]
pub enum PanelMessage {
    FontFamily(String),
    FontSize(String),
    TextColor(String),
    UpdateInterval(String),
    AudioUpdateInterval(String),
    Anchor(Anchor),
    TextAlign(TextAlign),
    AudioEnabled(bool),
    PauseOnForeground(bool),
    Monitor(String),
    MarginX(String),
    MarginY(String),
    Save,
    Close,
}

/// What the owner of the panel has to do after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    None,
    Save,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
enum Status {
    Editing,
    Saved,
    Rejected(Vec<String>),
}

pub struct SettingsPanel {
    font_family: String,
    // Type-to-filter list of installed families
    fonts: combo_box::State<String>,
    font_size: String,
    text_color: String,
    update_interval: String,
    audio_update_interval: String,
    anchor: Anchor,
    text_align: TextAlign,
    audio_enabled: bool,
    pause_on_foreground: bool,
    monitor: String,
    monitor_names: Vec<String>,
    margin_x: String,
    margin_y: String,
    status: Status,
}

impl SettingsPanel {
    /// Draft filled from the live settings. `current` is the monitor the
    /// overlay is on, preselected when the configured one is not connected.
    /// `fonts` are the families offered in the font picker.
    pub fn new(settings: &Settings, monitors: &[Monitor], current: &Monitor, fonts: Vec<String>) -> Self {

        let mut monitor_names: Vec<String> = monitors.iter().map(|m| m.name.clone()).collect();
        if monitor_names.is_empty() {
            monitor_names.push(current.name.clone());
        }
        let monitor = settings
            .monitor_device
            .clone()
            .filter(|name| monitor_names.contains(name))
            .unwrap_or_else(|| current.name.clone());

        Self {
            font_family: settings.font_family.clone(),
            fonts: combo_box::State::new(font_choices(&settings.font_family, fonts)),
            font_size: settings.font_size.to_string(),
            text_color: settings.text_color.clone(),
            update_interval: settings.update_interval.to_string(),
            audio_update_interval: settings.audio_update_interval.to_string(),
            anchor: settings.anchor,
            text_align: settings.text_align,
            audio_enabled: settings.audio_enabled,
            pause_on_foreground: settings.pause_on_foreground,
            monitor,
            monitor_names,
            margin_x: settings.margin_x.to_string(),
            margin_y: settings.margin_y.to_string(),
            status: Status::Editing,
        }
    }

    pub fn update(&mut self, message: PanelMessage) -> PanelAction {
        match message {
            PanelMessage::FontFamily(value) => self.font_family = value,
            PanelMessage::FontSize(value) => self.font_size = value,
            PanelMessage::TextColor(value) => self.text_color = value,
            PanelMessage::UpdateInterval(value) => self.update_interval = value,
            PanelMessage::AudioUpdateInterval(value) => self.audio_update_interval = value,
            PanelMessage::Anchor(anchor) => self.anchor = anchor,
            PanelMessage::TextAlign(align) => self.text_align = align,
            PanelMessage::AudioEnabled(enabled) => self.audio_enabled = enabled,
            PanelMessage::PauseOnForeground(enabled) => self.pause_on_foreground = enabled,
            PanelMessage::Monitor(name) => self.monitor = name,
            PanelMessage::MarginX(value) => self.margin_x = value,
            PanelMessage::MarginY(value) => self.margin_y = value,
            PanelMessage::Save => return PanelAction::Save,
            PanelMessage::Close => return PanelAction::Close,
        }
        self.status = Status::Editing;
        PanelAction::None
    }

    /// Every field of the form as a key/value pair for the store
    pub fn changes(&self) -> Vec<(SettingKey, Value)> {
        vec![
            (SettingKey::FontFamily, Value::from(self.font_family.clone())),
            (SettingKey::FontSize, Value::from(self.font_size.clone())),
            (SettingKey::TextColor, Value::from(self.text_color.clone())),
            (SettingKey::UpdateInterval, Value::from(self.update_interval.clone())),
            (SettingKey::AudioUpdateInterval, Value::from(self.audio_update_interval.clone())),
            (SettingKey::PauseOnForeground, Value::from(self.pause_on_foreground)),
            (SettingKey::Anchor, Value::from(self.anchor.as_str())),
            (SettingKey::TextAlign, Value::from(self.text_align.as_str())),
            (SettingKey::AudioEnabled, Value::from(self.audio_enabled)),
            (SettingKey::MarginX, Value::from(self.margin_x.clone())),
            (SettingKey::MarginY, Value::from(self.margin_y.clone())),
            (SettingKey::MonitorDevice, Value::from(self.monitor.clone())),
        ]
    }

    pub fn show_result(&mut self, rejected: &[SettingsError]) {
        self.status = if rejected.is_empty() {
            Status::Saved
        } else {
            Status::Rejected(rejected.iter().map(ToString::to_string).collect())
        };
    }

    pub fn rejected(&self) -> &[String] {
        match &self.status {
            Status::Rejected(errors) => errors,
            _ => &[],
        }
    }

    pub fn view(&self) -> Element<'_, PanelMessage> {
        let form = column![
            field(
                "Font Family:",
                combo_box(&self.fonts, "Type to search fonts", Some(&self.font_family), PanelMessage::FontFamily)
            ),
            field(
                "Font Size (8-48):",
                text_input("12", &self.font_size).on_input(PanelMessage::FontSize)
            ),
            field(
                "Text Color:",
                text_input("white or #rrggbb", &self.text_color).on_input(PanelMessage::TextColor)
            ),
            field(
                "Update Interval (ms):",
                text_input("1000", &self.update_interval).on_input(PanelMessage::UpdateInterval)
            ),
            field(
                "Audio Update Interval (ms):",
                text_input("50", &self.audio_update_interval).on_input(PanelMessage::AudioUpdateInterval)
            ),
            field(
                "Alignment:",
                pick_list(&Anchor::ALL[..], Some(self.anchor), PanelMessage::Anchor)
            ),
            field(
                "Text Align:",
                pick_list(&TextAlign::ALL[..], Some(self.text_align), PanelMessage::TextAlign)
            ),
            field(
                "Audio Visualizer:",
                checkbox("Enabled", self.audio_enabled).on_toggle(PanelMessage::AudioEnabled)
            ),
            field(
                "Pause On Fullscreen Apps:",
                checkbox("Enabled", self.pause_on_foreground).on_toggle(PanelMessage::PauseOnForeground)
            ),
            field(
                "Target Monitor:",
                pick_list(self.monitor_names.clone(), Some(self.monitor.clone()), PanelMessage::Monitor)
            ),
            field(
                "Margin X:",
                text_input("12", &self.margin_x).on_input(PanelMessage::MarginX)
            ),
            field(
                "Margin Y:",
                text_input("12", &self.margin_y).on_input(PanelMessage::MarginY)
            ),
            row![
                button("Save").on_press(PanelMessage::Save),
                button("Close").on_press(PanelMessage::Close),
            ]
            .spacing(12),
        ]
        .spacing(8);

        let status: Element<'_, PanelMessage> = match &self.status {
            Status::Editing => column![].into(),
            Status::Saved => text("Saved").style(styles::status_ok).into(),
            Status::Rejected(errors) => column(
                errors
                    .iter()
                    .map(|e| text(e.clone()).style(styles::status_error).into()),
            )
            .spacing(4)
            .into(),
        };

        container(column![form, status].spacing(12))
            .padding(16)
            .width(Length::Fill)
            .into()
    }
}

fn field<'a>(label: &'a str, control: impl Into<Element<'a, PanelMessage>>) -> Element<'a, PanelMessage> {
    row![text(label).width(Length::Fixed(LABEL_WIDTH)), control.into()]
        .spacing(8)
        .align_y(Alignment::Center)
        .into()
}
