//! Output context abstraction.
//!
//! Provides the pieces every backend shares:
//! - `ContextState`: the lifecycle state reported by the platform
//! - `ContextHealth`: the three-way classification the manager acts on
//! - `AudioBuffer`: decoded, interleaved samples ready for playback
//! - `GainNode`: a persistent per-sound volume control wired to one context
//! - `AudioContext` / `ContextFactory`: the backend seam
//!
//! # Lifecycle
//!
//! ```text
//!   Suspended ──resume()──▶ Running
//!       │                      │
//!       └──────┬───────────────┘
//!              ▼
//!   Interrupted / Closed / Other  ==  Dead  ──▶ replaced by the manager
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boardsound_common::{ContextId, SoundResult};
use parking_lot::Mutex;

/// Lifecycle state reported by an output context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextState {
    /// Producing audio.
    Running,
    /// Waiting for a resume, usually gated on a user gesture.
    Suspended,
    /// Taken away by the platform (phone call, audio focus loss).
    Interrupted,
    /// Torn down; can never run again.
    Closed,
    /// Any state this crate does not know about.
    Other(String),
}

impl ContextState {
    /// Classifies the state for reconciliation.
    #[must_use]
    pub fn health(&self) -> ContextHealth {
        match self {
            Self::Running => ContextHealth::Running,
            Self::Suspended => ContextHealth::Suspended,
            Self::Interrupted | Self::Closed | Self::Other(_) => ContextHealth::Dead,
        }
    }

    /// Whether the context is producing audio.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Suspended => f.write_str("suspended"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::Closed => f.write_str("closed"),
            Self::Other(state) => f.write_str(state),
        }
    }
}

/// What the manager does with a context in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextHealth {
    /// Usable as is.
    Running,
    /// Usable after a resume.
    Suspended,
    /// Must be replaced.
    Dead,
}

/// Decoded audio ready for playback.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Create a new audio buffer from interleaved samples.
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Interleaved sample data.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of samples per channel.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Playback duration at normal speed.
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Size of the decoded data in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }
}

/// Persistent volume control owned by one [`Sound`](crate::sound::Sound).
///
/// Every transient playback of the sound routes through the same node, so a
/// volume change made by one play applies to every overlapping play of that
/// sound (last write wins).
#[derive(Debug)]
pub struct GainNode {
    value: AtomicU32,
    changed_at: AtomicU64,
    destination: Mutex<Option<ContextId>>,
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new()
    }
}

impl GainNode {
    /// Creates a disconnected node at unity gain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: AtomicU32::new(1.0_f32.to_bits()),
            changed_at: AtomicU64::new(0.0_f64.to_bits()),
            destination: Mutex::new(None),
        }
    }

    /// Sets the gain, effective from `time` on the context clock.
    pub fn set_value_at_time(&self, value: f32, time: f64) {
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        self.value.store(value.to_bits(), Ordering::Relaxed);
        self.changed_at.store(time.to_bits(), Ordering::Relaxed);
    }

    /// Current gain value.
    #[must_use]
    pub fn value(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Context time of the last gain change.
    #[must_use]
    pub fn changed_at(&self) -> f64 {
        f64::from_bits(self.changed_at.load(Ordering::Relaxed))
    }

    /// Connects the node to a context's destination, replacing any previous
    /// connection.
    pub fn connect(&self, context: ContextId) {
        *self.destination.lock() = Some(context);
    }

    /// Disconnects the node from its destination.
    pub fn disconnect(&self) {
        *self.destination.lock() = None;
    }

    /// The context this node feeds, if any.
    #[must_use]
    pub fn destination(&self) -> Option<ContextId> {
        *self.destination.lock()
    }

    /// Whether the node feeds the given context.
    #[must_use]
    pub fn is_connected_to(&self, context: ContextId) -> bool {
        self.destination() == Some(context)
    }
}

/// A platform audio output context.
#[async_trait]
pub trait AudioContext: Send + Sync + fmt::Debug {
    /// Identity of this context instance.
    fn id(&self) -> ContextId;

    /// Current lifecycle state.
    fn state(&self) -> ContextState;

    /// Context clock in seconds.
    fn current_time(&self) -> f64;

    /// Resumes a suspended context.
    ///
    /// May stay pending until the user interacts with the application.
    async fn resume(&self) -> SoundResult<()>;

    /// Releases the platform resources. The state becomes `Closed`.
    fn close(&self);

    /// Decodes encoded audio bytes.
    async fn decode(&self, encoded: Vec<u8>) -> SoundResult<AudioBuffer>;

    /// Plays `buffer` once through `gain`, completing when playback ends.
    ///
    /// Fails with `StaleContext` when `gain` is not connected to this context.
    async fn play_one_shot(&self, buffer: &AudioBuffer, gain: Arc<GainNode>) -> SoundResult<()>;
}

/// Constructs fresh output contexts.
pub trait ContextFactory: Send + Sync {
    /// Opens a new context.
    fn create(&self) -> SoundResult<Arc<dyn AudioContext>>;
}
