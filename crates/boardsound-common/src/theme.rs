//! Sound theme identifiers.
//!
//! A theme names a directory of clips on the asset server. Two values are
//! sentinels with playback policy attached rather than clip sets of their own:
//!
//! - `silent` disables the engine entirely
//! - `music` suppresses board-event clips and plays everything else from
//!   `standard`

use serde::{Deserialize, Serialize};

/// Identifier of the silent sentinel theme.
pub const SILENT_THEME: &str = "silent";

/// Identifier of the music sentinel theme.
pub const MUSIC_THEME: &str = "music";

/// Identifier of the fallback clip set.
pub const STANDARD_THEME: &str = "standard";

/// A sound theme identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(String);

impl Theme {
    /// Creates a theme from its identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The `silent` sentinel.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(SILENT_THEME)
    }

    /// The `music` sentinel.
    #[must_use]
    pub fn music() -> Self {
        Self::new(MUSIC_THEME)
    }

    /// The `standard` clip set.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_THEME)
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this theme disables all playback.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.0 == SILENT_THEME
    }

    /// Whether this is the music sentinel.
    #[must_use]
    pub fn is_music(&self) -> bool {
        self.0 == MUSIC_THEME
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::standard()
    }
}

impl From<&str> for Theme {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
