//! Error types for boardsound operations.

use thiserror::Error;

/// Errors raised while loading, playing or narrating sounds.
#[derive(Debug, Error)]
pub enum SoundError {
    /// The asset server answered with a non-success status.
    #[error("Fetch of {url} failed with status {status}")]
    Fetch {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The request never produced a response.
    #[error("Network error fetching {url}: {message}")]
    Network {
        /// Requested URL
        url: String,
        /// Transport error message
        message: String,
    },

    /// Encoded bytes could not be decoded into an audio buffer.
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// The output context did not resume within the grace window.
    #[error("Autoplay blocked: audio context not running after {grace_ms} ms")]
    AutoplayBlocked {
        /// Grace window in milliseconds
        grace_ms: u64,
    },

    /// The platform speech API failed.
    #[error("Speech error: {0}")]
    Speech(String),

    /// The platform could not construct an output context.
    #[error("Audio context unavailable: {0}")]
    ContextUnavailable(String),

    /// A gain node was used with a context it is not connected to.
    #[error("Gain node is not connected to the active audio context")]
    StaleContext,
}

impl SoundError {
    /// Whether this error belongs to the fetch class (status or transport).
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Network { .. })
    }
}

/// Result type alias for boardsound operations.
pub type SoundResult<T> = Result<T, SoundError>;
