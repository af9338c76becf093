//! Engine configuration.
//!
//! Asset location, the initial theme, timing windows and the speech language.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use boardsound_common::{Theme, BOARD_EVENTS, GENERIC_NOTIFY};

/// Configuration file name.
const CONFIG_FILE: &str = "boardsound.toml";

/// Errors from reading or writing configuration and preference files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing to TOML failed.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Parsing TOML failed.
    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Assets ===
    /// Base URL sound paths are resolved against
    pub asset_base_url: String,
    /// Version segment inserted as `_<version>` after the base URL
    pub asset_version: Option<String>,

    // === Theme ===
    /// Theme used when no preference has been stored
    pub theme: Theme,
    /// Sounds cached by `preload_board_sounds`
    pub board_sounds: Vec<String>,

    // === Timing ===
    /// How long a play waits for a suspended context to resume
    pub autoplay_grace_ms: u64,
    /// Window in which `play_once` suppresses repeats across clients
    pub play_once_debounce_ms: u64,
    /// Spacing between countdown ticks
    pub countdown_interval_ms: u64,

    // === Speech ===
    /// Language of untranslated utterances
    pub speech_lang: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut board_sounds: Vec<String> = BOARD_EVENTS.iter().map(ToString::to_string).collect();
        board_sounds.push(GENERIC_NOTIFY.to_string());

        Self {
            // Assets
            asset_base_url: "/assets".to_string(),
            asset_version: None,

            // Theme
            theme: Theme::standard(),
            board_sounds,

            // Timing
            autoplay_grace_ms: 400,
            play_once_debounce_ms: 2000,
            countdown_interval_ms: 500,

            // Speech
            speech_lang: "en-US".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to the default file location.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    fn config_path() -> PathBuf {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
            .map_or_else(
                || PathBuf::from(CONFIG_FILE),
                |dir| dir.join("boardsound").join(CONFIG_FILE),
            )
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.autoplay_grace_ms = self.autoplay_grace_ms.clamp(50, 5_000);
        self.play_once_debounce_ms = self.play_once_debounce_ms.clamp(100, 60_000);
        self.countdown_interval_ms = self.countdown_interval_ms.clamp(100, 5_000);

        if self.asset_base_url.trim().is_empty() {
            self.asset_base_url = Self::default().asset_base_url;
        }
        if self.speech_lang.trim().is_empty() {
            self.speech_lang = Self::default().speech_lang;
        }
        if self.theme.as_str().is_empty() {
            self.theme = Theme::standard();
        }
    }

    /// Grace window as a duration.
    #[must_use]
    pub const fn autoplay_grace(&self) -> Duration {
        Duration::from_millis(self.autoplay_grace_ms)
    }

    /// Debounce window as a duration.
    #[must_use]
    pub const fn play_once_debounce(&self) -> Duration {
        Duration::from_millis(self.play_once_debounce_ms)
    }

    /// Countdown spacing as a duration.
    #[must_use]
    pub const fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.asset_base_url, "/assets");
        assert_eq!(config.theme, Theme::standard());
        assert_eq!(config.autoplay_grace(), Duration::from_millis(400));
        assert_eq!(config.play_once_debounce(), Duration::from_millis(2000));
        assert_eq!(config.countdown_interval(), Duration::from_millis(500));
        assert_eq!(config.board_sounds, vec!["move", "capture", "check", "genericNotify"]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.autoplay_grace_ms = 0;
        config.countdown_interval_ms = 1_000_000;
        config.speech_lang = "  ".to_string();

        config.validate();

        assert_eq!(config.autoplay_grace_ms, 50);
        assert_eq!(config.countdown_interval_ms, 5_000);
        assert_eq!(config.speech_lang, "en-US");
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("boardsound.toml");

        let mut config = EngineConfig::default();
        config.theme = Theme::new("robot");
        config.asset_version = Some("a1b2".to_string());
        config.countdown_interval_ms = 750;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/boardsound.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_load_partial_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("boardsound.toml");
        fs::write(&config_path, "theme = \"piano\"\n").expect("write");

        let config = EngineConfig::load_from(&config_path);
        assert_eq!(config.theme, Theme::new("piano"));
        assert_eq!(config.autoplay_grace_ms, 400);
    }

    #[test]
    fn test_config_load_garbage_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("boardsound.toml");
        fs::write(&config_path, "theme = [").expect("write");

        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
    }
}
