//! # Boardsound Engine
//!
//! Sound cues, countdowns and spoken moves for a board-game client.
//!
//! [`SoundEngine`] is the entry point: construct it once at startup with
//! [`SoundEngineBuilder`], injecting the storage, bus and platform
//! collaborators, and keep it for the life of the process.
//!
//! # Quick Start
//!
//! ```ignore
//! use boardsound_engine::{EngineConfig, SoundEngine};
//!
//! boardsound_engine::logging::init_tracing(boardsound_engine::logging::DEFAULT_LOG_DIRECTIVE);
//!
//! let engine = SoundEngine::builder(EngineConfig::load()).build()?;
//! engine.preload_board_sounds().await;
//!
//! // Board events
//! engine.play("move", 1.0).await?;
//!
//! // Arena start
//! engine.countdown(3).await;
//!
//! // Narration
//! engine.say_san(Some("Nf3"), true);
//! ```
//!
//! # Modules
//!
//! - [`settings`]: persisted volume, speech and theme preferences
//! - [`theme`]: the active theme and themed-sound eviction
//! - [`playback`]: play policy, autoplay grace window, cross-client debounce
//! - [`countdown`]: timed countdown cues with prefetch
//! - [`speech`] / [`notation`]: utterances and SAN-to-words translation
//! - [`store`], [`bus`], [`platform`]: collaborator seams and default
//!   implementations
//! - [`config`]: engine configuration file
//! - [`logging`]: tracing subscriber setup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bus;
pub mod config;
pub mod countdown;
pub mod engine;
pub mod logging;
pub mod notation;
pub mod platform;
pub mod playback;
pub mod settings;
pub mod speech;
pub mod store;
pub mod theme;

pub use bus::{EventBus, ThemeBus, ThemeEvent};
pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use countdown::{CountdownSequencer, CountdownState};
pub use engine::{SoundEngine, SoundEngineBuilder};
pub use notation::{san_to_words, ChessRoles, RoleLookup};
pub use platform::{AmbientHook, AutoplayNotice, LoggingNotice, Microphone, Platform, StaticPlatform};
pub use playback::{PlayDecision, PlaybackCoordinator};
pub use settings::SoundSettings;
pub use speech::{SayOptions, SpeechNarrator, SpeechSynth, TracingSynth, Utterance};
pub use store::{KeyValueStore, MemoryStore, TomlFileStore};
pub use theme::ThemeController;

pub use boardsound_common::{SoundError, SoundResult, Theme};
