//! Configuration for offline item sync.
//!
//! Loaded from TOML; every section falls back to defaults when absent.
//!
//! ```toml
//! timeout_secs = 60
//!
//! [offline]
//! enabled = true
//! wifi_only = false
//! comments = true
//!
//! [storage]
//! deferral_path = "/tmp/deferred.json"
//! ```

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::ports::PreferenceSource;

const CONFIG_DIR: &str = "itemsync";
const CONFIG_FILE: &str = "config.toml";
const DEFERRAL_FILE: &str = "deferred.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// One-shot timeout per job run, in seconds.
    pub timeout_secs: u64,
    /// User preferences that seed new jobs.
    pub offline: OfflineConfig,
    pub storage: StorageConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            offline: OfflineConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Global switch; when off, nothing is scheduled.
    pub enabled: bool,
    /// Only sync over unmetered networks.
    pub wifi_only: bool,
    /// Extract readable text for stories.
    pub readability: bool,
    /// Cache linked article pages.
    pub article: bool,
    /// Walk and cache replies.
    pub comments: bool,
    /// Show a progress indicator while syncing.
    pub notification: bool,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wifi_only: true,
            readability: true,
            article: false,
            comments: true,
            notification: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Deferral store file. `None` = `<config dir>/itemsync/deferred.json`.
    pub deferral_path: Option<PathBuf>,
}

impl SyncConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SyncError::Config(e.to_string()))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `~/.config/itemsync/config.toml` (platform config dir).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn deferral_path(&self) -> Option<PathBuf> {
        self.storage
            .deferral_path
            .clone()
            .or_else(|| dirs::config_dir().map(|p| p.join(CONFIG_DIR).join(DEFERRAL_FILE)))
    }
}

/// Current network state as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Offline,
    Metered,
    Unmetered,
}

/// [`PreferenceSource`] backed by [`OfflineConfig`] and a settable
/// connectivity state.
#[derive(Debug)]
pub struct ConfigPreferences {
    offline: OfflineConfig,
    connectivity: RwLock<Connectivity>,
}

impl ConfigPreferences {
    pub fn new(offline: OfflineConfig, connectivity: Connectivity) -> Self {
        Self {
            offline,
            connectivity: RwLock::new(connectivity),
        }
    }

    pub fn set_connectivity(&self, connectivity: Connectivity) {
        *self
            .connectivity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = connectivity;
    }

    pub fn connectivity(&self) -> Connectivity {
        *self
            .connectivity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreferenceSource for ConfigPreferences {
    fn offline_enabled(&self) -> bool {
        self.offline.enabled
    }

    fn wifi_only(&self) -> bool {
        self.offline.wifi_only
    }

    fn current_connection_enabled(&self) -> bool {
        match self.connectivity() {
            Connectivity::Offline => false,
            Connectivity::Metered => !self.offline.wifi_only,
            Connectivity::Unmetered => true,
        }
    }

    fn readability_enabled(&self) -> bool {
        self.offline.readability
    }

    fn article_enabled(&self) -> bool {
        self.offline.article
    }

    fn comments_enabled(&self) -> bool {
        self.offline.comments
    }

    fn notification_enabled(&self) -> bool {
        self.offline.notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_toml_gives_defaults() {
        let config: SyncConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.offline.enabled);
        assert!(config.offline.comments);
        assert!(config.storage.deferral_path.is_none());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            timeout_secs = 5
            [offline]
            article = true
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert!(config.offline.article);
        assert!(config.offline.wifi_only);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = SyncConfig::default();
        config.offline.notification = true;
        config.storage.deferral_path = Some(dir.path().join("d.json"));
        config.save_to_file(&path).unwrap();

        let loaded = SyncConfig::from_file(&path).unwrap();
        assert!(loaded.offline.notification);
        assert_eq!(loaded.deferral_path(), Some(dir.path().join("d.json")));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();
        assert!(matches!(
            SyncConfig::from_file(&path),
            Err(SyncError::Config(_))
        ));
    }

    #[rstest]
    #[case::offline(Connectivity::Offline, true, false)]
    #[case::metered_wifi_only(Connectivity::Metered, true, false)]
    #[case::metered_any(Connectivity::Metered, false, true)]
    #[case::unmetered(Connectivity::Unmetered, true, true)]
    fn connection_enabled_follows_wifi_only(
        #[case] connectivity: Connectivity,
        #[case] wifi_only: bool,
        #[case] expected: bool,
    ) {
        let prefs = ConfigPreferences::new(
            OfflineConfig {
                wifi_only,
                ..OfflineConfig::default()
            },
            connectivity,
        );
        assert_eq!(prefs.current_connection_enabled(), expected);
    }

    #[test]
    fn connectivity_can_change_at_runtime() {
        let prefs = ConfigPreferences::new(OfflineConfig::default(), Connectivity::Offline);
        assert!(!prefs.current_connection_enabled());
        prefs.set_connectivity(Connectivity::Unmetered);
        assert!(prefs.current_connection_enabled());
    }
}
