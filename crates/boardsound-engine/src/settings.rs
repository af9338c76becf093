//! Persisted sound preferences.

use std::sync::Arc;

use tracing::debug;

use boardsound_common::Theme;

use crate::store::KeyValueStore;

/// Storage key of the volume preference.
pub const VOLUME_KEY: &str = "sound-volume";
/// Storage key of the speech flag.
pub const SPEECH_KEY: &str = "speech.enabled";
/// Storage key of the active theme.
pub const THEME_KEY: &str = "sound-set";
/// Storage key of the last `play_once` timestamp, in Unix milliseconds.
pub const JUST_PLAYED_KEY: &str = "just-played";

/// Volume used when the stored value is missing or malformed.
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Parses a stored volume, falling back to [`DEFAULT_VOLUME`] unless the
/// value is a finite, non-negative number.
#[must_use]
pub fn parse_volume(raw: Option<&str>) -> f32 {
    raw.and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(DEFAULT_VOLUME)
}

/// Typed view over the preference store.
#[derive(Clone)]
pub struct SoundSettings {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SoundSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundSettings")
            .field("volume", &self.volume())
            .field("speech", &self.speech())
            .finish_non_exhaustive()
    }
}

impl SoundSettings {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Master volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        parse_volume(self.store.get(VOLUME_KEY).as_deref())
    }

    /// Stores the master volume, clamped to `0.0..=1.0`.
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { DEFAULT_VOLUME };
        self.store.set(VOLUME_KEY, &volume.to_string());
        debug!("Volume set to {:.2}", volume);
    }

    /// Whether moves and events are narrated.
    #[must_use]
    pub fn speech(&self) -> bool {
        self.store.get(SPEECH_KEY).as_deref() == Some("true")
    }

    /// Stores the speech flag.
    pub fn set_speech(&self, enabled: bool) {
        self.store.set(SPEECH_KEY, if enabled { "true" } else { "false" });
    }

    /// Persisted theme, if any.
    #[must_use]
    pub fn stored_theme(&self) -> Option<Theme> {
        self.store
            .get(THEME_KEY)
            .filter(|t| !t.trim().is_empty())
            .map(Theme::new)
    }

    /// Persists the active theme.
    pub fn store_theme(&self, theme: &Theme) {
        self.store.set(THEME_KEY, theme.as_str());
    }

    /// Unix-millisecond timestamp of the last `play_once`, if readable.
    #[must_use]
    pub fn last_played(&self) -> Option<u64> {
        self.store.get(JUST_PLAYED_KEY)?.trim().parse().ok()
    }

    /// Records a `play_once` at `now_ms`.
    pub fn mark_played(&self, now_ms: u64) {
        self.store.set(JUST_PLAYED_KEY, &now_ms.to_string());
    }
}
