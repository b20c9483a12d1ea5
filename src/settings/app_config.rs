//! On-disk application configuration.
//!
//! The file is optional. Missing keys fall back to their defaults, so a
//! config containing only `{"work_minutes": 50}` is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ConfigError;
use crate::types::{SessionConfig, DEFAULT_BREAK_MINUTES, DEFAULT_WORK_MINUTES};

/// Directory name under the platform config directory.
const CONFIG_DIR_NAME: &str = "pomodoro-player";

/// File name of the configuration file.
const CONFIG_FILE_NAME: &str = "config.json";

fn default_work_minutes() -> u32 {
    DEFAULT_WORK_MINUTES
}

fn default_break_minutes() -> u32 {
    DEFAULT_BREAK_MINUTES
}

fn default_playlist_path() -> PathBuf {
    PathBuf::from("assets/playlist.json")
}

fn default_cues_path() -> PathBuf {
    PathBuf::from("assets/sfx.json")
}

/// Vibration length of the phase-change cue.
fn default_vibration_ms() -> u64 {
    1000
}

fn default_sound() -> bool {
    true
}

/// Application configuration.
///
/// # Example
///
/// ```
/// use pomodoro_player::settings::AppConfig;
///
/// let config: AppConfig = serde_json::from_str(r#"{"work_minutes": 50}"#).unwrap();
/// assert_eq!(config.work_minutes, 50);
/// assert_eq!(config.break_minutes, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Work interval in minutes.
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,

    /// Break interval in minutes.
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,

    /// Path to the playlist JSON file.
    #[serde(default = "default_playlist_path")]
    pub playlist: PathBuf,

    /// Path to the cue (bell) JSON file.
    #[serde(default = "default_cues_path")]
    pub cues: PathBuf,

    /// Length of the haptic alert in milliseconds.
    #[serde(default = "default_vibration_ms")]
    pub vibration_ms: u64,

    /// Whether audio output is enabled.
    #[serde(default = "default_sound")]
    pub sound: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            playlist: default_playlist_path(),
            cues: default_cues_path(),
            vibration_ms: default_vibration_ms(),
            sound: default_sound(),
        }
    }
}

impl AppConfig {
    /// Reads the configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read and
    /// `ConfigError::Parse` if it is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads the configuration, or returns defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load) for files that exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Writes the configuration as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Write` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Write(path.to_path_buf(), e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| ConfigError::Write(path.to_path_buf(), e.to_string()))
    }

    /// Returns the validated session durations.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotPositive` for a zero duration.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        SessionConfig::from_minutes(self.work_minutes, self.break_minutes)
    }

    /// Returns the vibration length as a `Duration`.
    pub fn vibration(&self) -> Duration {
        Duration::from_millis(self.vibration_ms)
    }
}

/// Returns the default configuration file location.
///
/// `None` if the platform has no config directory (e.g. no `$HOME`).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.work_minutes, 25);
        assert_eq!(config.break_minutes, 5);
        assert_eq!(config.playlist, PathBuf::from("assets/playlist.json"));
        assert_eq!(config.cues, PathBuf::from("assets/sfx.json"));
        assert_eq!(config.vibration_ms, 1000);
        assert!(config.sound);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"break_minutes": 10}"#).unwrap();
        assert_eq!(config.work_minutes, 25);
        assert_eq!(config.break_minutes, 10);
        assert!(config.sound);
    }

    #[test]
    fn test_session_config_validation() {
        let config = AppConfig {
            work_minutes: 0,
            ..AppConfig::default()
        };
        assert!(config.session_config().is_err());

        let session = AppConfig::default().session_config().unwrap();
        assert_eq!(session.work_seconds(), 1500);
    }

    #[test]
    fn test_vibration_duration() {
        assert_eq!(AppConfig::default().vibration(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            work_minutes: 50,
            sound: false,
            ..AppConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_default_config_path_file_name() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("pomodoro-player/config.json"));
        }
    }
}
