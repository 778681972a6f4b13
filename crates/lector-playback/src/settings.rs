//! Persisted player settings.
//!
//! Settings survive restarts through a [`SettingsStore`]. The TOML store is
//! tolerant on load: a missing or unreadable file yields defaults so a
//! corrupt settings file never blocks playback.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// User preferences carried across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub speed: f32,
    pub auto_continue: bool,
    pub voice_id: Option<String>,
    pub api_key: Option<String>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            auto_continue: true,
            voice_id: None,
            api_key: None,
        }
    }
}

/// Where settings are read from and written to.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> PlaybackSettings;
    async fn save(&self, settings: &PlaybackSettings) -> Result<(), SettingsError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: RwLock<PlaybackSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> PlaybackSettings {
        self.settings.read().clone()
    }

    async fn save(&self, settings: &PlaybackSettings) -> Result<(), SettingsError> {
        *self.settings.write() = settings.clone();
        Ok(())
    }
}

/// TOML file store.
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn load(&self) -> PlaybackSettings {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "settings", path = %self.path.display(), "No settings file, using defaults");
                return PlaybackSettings::default();
            }
            Err(e) => {
                warn!(target: "settings", path = %self.path.display(), error = %e, "Failed to read settings, using defaults");
                return PlaybackSettings::default();
            }
        };
        match toml::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(target: "settings", path = %self.path.display(), error = %e, "Failed to parse settings, using defaults");
                PlaybackSettings::default()
            }
        }
    }

    async fn save(&self, settings: &PlaybackSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let serialized = toml::to_string_pretty(settings)?;
        tokio::fs::write(&self.path, serialized).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn toml_store_round_trips_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlSettingsStore::new(dir.path().join("settings.toml"));

        let settings = PlaybackSettings {
            speed: 1.5,
            auto_continue: false,
            voice_id: Some("sarah".to_string()),
            api_key: Some("sk-test".to_string()),
        };
        store.save(&settings).await.unwrap();

        assert_eq!(store.load().await, settings);
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlSettingsStore::new(dir.path().join("nope.toml"));

        assert_eq!(store.load().await, PlaybackSettings::default());
    }

    #[tokio::test]
    async fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        tokio::fs::write(&path, "not = [valid").await.unwrap();

        let store = TomlSettingsStore::new(path);
        assert_eq!(store.load().await, PlaybackSettings::default());
    }

    #[tokio::test]
    async fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlSettingsStore::new(dir.path().join("deep/nested/settings.toml"));

        store.save(&PlaybackSettings::default()).await.unwrap();
        assert_eq!(store.load().await, PlaybackSettings::default());
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        tokio::fs::write(&path, "speed = 2.0\n").await.unwrap();

        let store = TomlSettingsStore::new(path);
        let settings = store.load().await;
        assert_eq!(settings.speed, 2.0);
        assert!(settings.auto_continue);
        assert_eq!(settings.voice_id, None);
    }
}
