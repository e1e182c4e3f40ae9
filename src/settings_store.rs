// Loading and saving settings.json.
// The store holds the live settings; the file is only a copy of them, so a
// failed write is logged and the app keeps running on what's in memory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::Value;

use crate::settings::{SettingKey, Settings, SettingsError};

pub const SETTINGS_FILE: &str = "settings.json";

/// Owns the live [`Settings`] and keeps settings.json in sync with it.
/// Every accepted change is written straight away.
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// settings.json next to the executable, or in the working directory
    /// when the executable path is unknown
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(SETTINGS_FILE)))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
    }

    /// Loads the file at `path`. A missing or unreadable file, or any key
    /// with an invalid value, falls back to the defaults; loading never fails.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match read_settings(&path) {
            Ok(Some(settings)) => {
                info!("Loaded settings from {:?}", path);
                settings
            }
            Ok(None) => {
                info!("No settings file at {:?}, using defaults", path);
                Settings::default()
            }
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Settings::default()
            }
        };
        Self { path, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Changes one key. An invalid value is rejected and the previous value
    /// stays in place. An accepted value is persisted immediately.
    #[allow(dead_code)] // The panel saves through apply_all
    pub fn update(&mut self, key: &str, value: &Value) -> Result<(), SettingsError> {
        let mut next = self.settings.clone();
        next.set_by_name(key, value)?;
        // Writing an unchanged value would only touch the file's mtime
        if next != self.settings {
            self.settings = next;
            self.persist();
        }
        Ok(())
    }

    /// Applies several changes at once, as the settings panel does on save.
    /// Valid pairs are kept even when others fail; the file is written once.
    /// Returns the rejected fields.
    pub fn apply_all(&mut self, pairs: &[(SettingKey, Value)]) -> Vec<SettingsError> {
        // Collected on a copy so the file is written once
        let mut next = self.settings.clone();
        let mut rejected = Vec::new();
        for (key, value) in pairs {
            if let Err(e) = next.set(*key, value) {
                debug!("Rejected setting: {}", e);
                rejected.push(e);
            }
        }
        if next != self.settings {
            self.settings = next;
            self.persist();
        }
        rejected
    }

    /// Writes the current settings. The file is replaced atomically so a crash
    /// mid-write leaves the previous version intact.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(&self.settings).context("Failed to serialize settings")?;
        // Same directory as the target so the rename stays on one volume
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace settings file {:?}", self.path))?;

        debug!("Saved settings to {:?}", self.path);
        Ok(())
    }

    fn persist(&self) {
        // The in-memory value stays authoritative when the disk write fails
        if let Err(e) = self.save() {
            warn!("{:#}", e);
        }
    }
}

fn read_settings(path: &Path) -> Result<Option<Settings>> {
    // First run: no file yet is not an error
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("Failed to read settings from {:?}", path))?;
    let value: Value =
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse JSON from {:?}", path))?;
    Ok(Some(Settings::from_json(&value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Anchor;
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::load(dir.path().join(SETTINGS_FILE))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.settings(), &Settings::default());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        let store = store_in(&dir);
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.update("anchor", &json!("bottom-right")).unwrap();
        store.update("update_interval", &json!(2000)).unwrap();
        assert!(store.path().exists());

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.settings().anchor, Anchor::BottomRight);
        assert_eq!(reloaded.settings().update_interval, 2000);
        assert_eq!(reloaded.settings(), store.settings());
        assert!(!dir.path().join("settings.json.tmp").exists());
    }

    #[test]
    fn test_rejected_update_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.update("anchor", &json!("top-right")).unwrap();
        assert!(store.update("anchor", &json!("center")).is_err());
        assert!(store.update("no_such_key", &json!(1)).is_err());
        assert_eq!(store.settings().anchor, Anchor::TopRight);
        assert_eq!(store_in(&dir).settings().anchor, Anchor::TopRight);
    }

    #[test]
    fn test_unchanged_value_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.update("font_size", &json!(12)).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_apply_all_reports_rejected_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let rejected = store.apply_all(&[
            (SettingKey::FontSize, json!("18")),
            (SettingKey::MarginX, json!("wide")),
            (SettingKey::AudioEnabled, json!(false)),
        ]);
        assert_eq!(rejected.len(), 1);
        assert!(matches!(
            rejected[0],
            SettingsError::InvalidValue { key: SettingKey::MarginX, .. }
        ));
        let reloaded = store_in(&dir);
        assert_eq!(reloaded.settings().font_size, 18);
        assert!(!reloaded.settings().audio_enabled);
        assert_eq!(reloaded.settings().margin_x, 12);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r##"{ "text_color": "#00ff00", "font_size": 200 }"##,
        )
        .unwrap();
        let store = store_in(&dir);
        assert_eq!(store.settings().text_color, "#00ff00");
        assert_eq!(store.settings().font_size, 12);
    }
}
