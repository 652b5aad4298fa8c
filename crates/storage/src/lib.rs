//! Persisted measuring settings
//!
//! Settings live in `settings.json` under the platform config directory,
//! wrapped in a versioned envelope.

use directories::ProjectDirs;
use measure_core::MeasureSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const SETTINGS_SCHEMA_VERSION: u32 = 1;
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve configuration directory")]
    NoConfigDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("settings schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsEnvelope {
    version: u32,
    settings: MeasureSettings,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "VectorMeasure", "VectorMeasure")
            .ok_or(StorageError::NoConfigDirectory)?;

        Ok(Self { root: dirs.config_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Load settings, falling back to defaults when none were saved
    pub fn load_settings(&self) -> Result<MeasureSettings, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(MeasureSettings::default());
        }

        let bytes = fs::read(path)?;
        let envelope: SettingsEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version > SETTINGS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: envelope.version,
                supported: SETTINGS_SCHEMA_VERSION,
            });
        }

        Ok(envelope.settings)
    }

    pub fn save_settings(&self, settings: &MeasureSettings) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope =
            SettingsEnvelope { version: SETTINGS_SCHEMA_VERSION, settings: settings.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.settings_path(), bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path().join("nested"));

        let settings =
            MeasureSettings { unit: "ft".to_owned(), zoom_step: 2.0, ..MeasureSettings::default() };

        store.save_settings(&settings).expect("save should succeed");
        let loaded = store.load_settings().expect("load should succeed");

        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let loaded = store.load_settings().expect("load should succeed");
        assert_eq!(loaded, MeasureSettings::default());
    }

    #[test]
    fn partial_settings_keep_defaults_for_missing_fields() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        fs::write(store.settings_path(), r#"{ "version": 1, "settings": { "container_width": 640.0 } }"#)
            .unwrap();

        let loaded = store.load_settings().expect("load should succeed");

        assert_eq!(loaded.container_width, 640.0);
        assert_eq!(loaded.unit, "m");
    }

    #[test]
    fn newer_schema_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        fs::write(store.settings_path(), r#"{ "version": 9, "settings": {} }"#).unwrap();

        let err = store.load_settings().expect_err("newer schema should fail");

        assert!(matches!(err, StorageError::UnsupportedVersion { found: 9, supported: 1 }));
    }
}
