use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::options::{CallKitConfiguration, ConnectOptions, DEFAULT_CONTACT_HANDLE};

const SETTINGS_FILE: &str = "voice-settings.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VoiceSettings {
    #[serde(default = "default_contact_handle")]
    pub default_contact_handle: String,
    #[serde(default)]
    pub notification_display_name: Option<String>,
    #[serde(default)]
    pub incoming_call_contact_handle_template: Option<String>,
    #[serde(default)]
    pub call_kit_configuration: Option<CallKitConfiguration>,
}

fn default_contact_handle() -> String {
    DEFAULT_CONTACT_HANDLE.to_string()
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            default_contact_handle: default_contact_handle(),
            notification_display_name: None,
            incoming_call_contact_handle_template: None,
            call_kit_configuration: None,
        }
    }
}

impl VoiceSettings {
    /// Fill connect options the caller left empty from stored preferences.
    pub fn apply_to(&self, mut options: ConnectOptions) -> ConnectOptions {
        if options.contact_handle.as_deref().is_none_or(str::is_empty) {
            options.contact_handle = Some(self.default_contact_handle.clone());
        }
        if options.notification_display_name.is_none() {
            options.notification_display_name = self.notification_display_name.clone();
        }
        options
    }
}

pub struct SettingsStore {
    settings: Mutex<VoiceSettings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join(SETTINGS_FILE);
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> VoiceSettings {
        self.lock().clone()
    }

    pub fn set_default_contact_handle(&self, handle: String) {
        self.lock().default_contact_handle = handle;
        self.save();
    }

    pub fn set_notification_display_name(&self, name: Option<String>) {
        self.lock().notification_display_name = name;
        self.save();
    }

    pub fn set_incoming_call_contact_handle_template(&self, template: Option<String>) {
        self.lock().incoming_call_contact_handle_template = template;
        self.save();
    }

    pub fn set_call_kit_configuration(&self, configuration: Option<CallKitConfiguration>) {
        self.lock().call_kit_configuration = configuration;
        self.save();
    }

    fn lock(&self) -> MutexGuard<'_, VoiceSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self) {
        let settings = self.get();
        if let Some(parent) = self.file_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("cannot create settings directory {}: {e}", parent.display());
                return;
            }
        }
        let written = serde_json::to_string_pretty(&settings)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&self.file_path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            tracing::warn!("failed to persist voice settings to {}: {e}", self.file_path.display());
        }
    }

    fn load(path: &Path) -> VoiceSettings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable voice settings {}: {e}", path.display());
                VoiceSettings::default()
            }),
            Err(_) => VoiceSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::HandleType;
    use std::fs;

    fn temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_new_creates_defaults_when_no_file() {
        let dir = temp_dir();
        let store = SettingsStore::new(dir.path().to_str().unwrap());
        let s = store.get();
        assert_eq!(s, VoiceSettings::default());
        assert_eq!(s.default_contact_handle, "Default Contact");
    }

    #[test]
    fn test_contact_handle_and_display_name_persist() {
        let dir = temp_dir();
        let path = dir.path().to_str().unwrap();
        {
            let store = SettingsStore::new(path);
            store.set_default_contact_handle("Support Line".to_string());
            store.set_notification_display_name(Some("Acme".to_string()));
        }
        let s = SettingsStore::new(path).get();
        assert_eq!(s.default_contact_handle, "Support Line");
        assert_eq!(s.notification_display_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_call_kit_configuration_persists() {
        let dir = temp_dir();
        let path = dir.path().to_str().unwrap();
        let config = CallKitConfiguration {
            maximum_call_groups: Some(1),
            supported_handle_types: Some(vec![HandleType::Generic]),
            ..Default::default()
        };
        SettingsStore::new(path).set_call_kit_configuration(Some(config.clone()));
        assert_eq!(SettingsStore::new(path).get().call_kit_configuration, Some(config));
    }

    #[test]
    fn test_clear_template() {
        let dir = temp_dir();
        let store = SettingsStore::new(dir.path().to_str().unwrap());
        store.set_incoming_call_contact_handle_template(Some("{DisplayName}".to_string()));
        store.set_incoming_call_contact_handle_template(None);
        assert_eq!(store.get().incoming_call_contact_handle_template, None);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = temp_dir();
        fs::write(dir.path().join(SETTINGS_FILE), "not json!!!").unwrap();
        let store = SettingsStore::new(dir.path().to_str().unwrap());
        assert_eq!(store.get(), VoiceSettings::default());
    }

    #[test]
    fn test_partial_json_uses_serde_defaults() {
        let dir = temp_dir();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"notification_display_name":"Eve"}"#,
        )
        .unwrap();
        let s = SettingsStore::new(dir.path().to_str().unwrap()).get();
        assert_eq!(s.notification_display_name.as_deref(), Some("Eve"));
        assert_eq!(s.default_contact_handle, "Default Contact");
    }

    #[test]
    fn test_apply_fills_only_missing_options() {
        let settings = VoiceSettings {
            default_contact_handle: "Stored".into(),
            notification_display_name: Some("Stored Name".into()),
            ..Default::default()
        };
        let filled = settings.apply_to(ConnectOptions {
            contact_handle: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(filled.contact_handle.as_deref(), Some("Stored"));
        assert_eq!(filled.notification_display_name.as_deref(), Some("Stored Name"));

        let kept = settings.apply_to(ConnectOptions {
            contact_handle: Some("Caller".into()),
            notification_display_name: Some("Mine".into()),
            ..Default::default()
        });
        assert_eq!(kept.contact_handle.as_deref(), Some("Caller"));
        assert_eq!(kept.notification_display_name.as_deref(), Some("Mine"));
    }
}
