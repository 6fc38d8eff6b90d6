//! Persistent user settings.
//!
//! Settings live in `settings.json` under the platform config directory
//! (`~/.config/gitnotify/settings.json` on Linux). Only preferences are
//! stored here; notification state is never persisted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::notifications::filters::FilterSettings;

const APP_DIR: &str = "gitnotify";
const SETTINGS_FILE: &str = "settings.json";

/// Lower bound of the poll interval.
pub const MIN_FETCH_INTERVAL_SECS: u64 = 60;

/// Display grouping of the notification list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum GroupBy {
    #[default]
    Repository,
    Date,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// User preferences consumed by the aggregator and the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Only threads the user participates in.
    pub participating: bool,
    /// Follow pagination until every page is fetched.
    pub fetch_all_notifications: bool,
    /// Include threads already marked as read.
    pub fetch_read_notifications: bool,
    /// Enrich notifications with subject details.
    pub detailed_notifications: bool,
    pub fetch_interval_secs: u64,

    pub group_by: GroupBy,
    /// Keep read notifications visible (flip `unread`) instead of removing
    /// them from the list.
    pub delay_notification_state: bool,
    pub mark_as_done_on_unsubscribe: bool,
    pub play_sound: bool,
    pub show_notifications: bool,
    /// Alert sound volume, 0 to 100.
    pub notification_volume: u8,

    pub filters: FilterSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            participating: false,
            fetch_all_notifications: true,
            fetch_read_notifications: false,
            detailed_notifications: true,
            fetch_interval_secs: MIN_FETCH_INTERVAL_SECS,
            group_by: GroupBy::Repository,
            delay_notification_state: false,
            mark_as_done_on_unsubscribe: false,
            play_sound: true,
            show_notifications: true,
            notification_volume: 20,
            filters: FilterSettings::default(),
        }
    }
}

impl Settings {
    /// Poll interval, never shorter than [`MIN_FETCH_INTERVAL_SECS`].
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs.max(MIN_FETCH_INTERVAL_SECS))
    }

    /// Volume as a 0.0 to 1.0 fraction.
    pub fn volume(&self) -> f32 {
        f32::from(self.notification_volume.min(100)) / 100.0
    }

    /// Load settings from `path`, or return defaults if the file does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write settings to `path`, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }
}

/// `<config dir>/gitnotify/settings.json`.
pub fn default_settings_path() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    path.push(APP_DIR);
    path.push(SETTINGS_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.fetch_all_notifications);
        assert!(settings.detailed_notifications);
        assert!(!settings.participating);
        assert_eq!(settings.group_by, GroupBy::Repository);
        assert_eq!(settings.notification_volume, 20);
        assert_eq!(settings.fetch_interval(), Duration::from_secs(60));
    }

    #[test]
    fn interval_is_clamped_to_minimum() {
        let settings = Settings {
            fetch_interval_secs: 5,
            ..Default::default()
        };
        assert_eq!(settings.fetch_interval(), Duration::from_secs(60));

        let settings = Settings {
            fetch_interval_secs: 300,
            ..Default::default()
        };
        assert_eq!(settings.fetch_interval(), Duration::from_secs(300));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "participating": true, "group_by": "Date" }"#).unwrap();
        assert!(settings.participating);
        assert_eq!(settings.group_by, GroupBy::Date);
        assert!(settings.play_sound);
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        if let Ok(path) = default_settings_path() {
            assert!(path.ends_with("gitnotify/settings.json"));
        }
    }
}
