//! # Boardsound Kernel
//!
//! Low-level sound plumbing for the boardsound engine:
//!
//! - [`context`]: output context abstraction, lifecycle states, gain nodes and
//!   decoded buffers
//! - [`manager`]: the process-wide context owner that replaces dead contexts and
//!   rewires every live gain node
//! - [`sound`]: a decoded clip with its persistent gain node
//! - [`cache`]: logical name to [`Sound`](sound::Sound) cache with themed eviction
//! - [`fetch`]: asset URL resolution and HTTP fetching
//! - [`backend`]: rodio-backed output context
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌─────────────────────┐
//! │ AssetFetcher │────▶│  SoundCache  │────▶│ AudioContextManager │
//! │  (HTTP GET)  │     │ name → Sound │     │ reconcile / resume  │
//! └──────────────┘     └──────────────┘     └─────────────────────┘
//!                             │                        │
//!                             ▼                        ▼
//!                      Sound { buffer, gain } ──▶ dyn AudioContext
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod cache;
pub mod context;
pub mod fetch;
pub mod manager;
pub mod sound;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{RodioContext, RodioContextFactory};
pub use cache::{SoundCache, ASSET_EXTENSION};
pub use context::{AudioBuffer, AudioContext, ContextFactory, ContextHealth, ContextState, GainNode};
pub use fetch::{AssetFetcher, AssetResolver, HttpFetcher, StaticAssetResolver};
pub use manager::AudioContextManager;
pub use sound::Sound;
