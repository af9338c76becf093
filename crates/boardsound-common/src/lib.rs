//! # Boardsound Common
//!
//! Shared types for the boardsound crates.
//!
//! - Error taxonomy (`SoundError`) shared by loading, playback and speech
//! - Theme identifiers, including the `silent` and `music` sentinels
//! - Logical sound names and their path spelling
//! - Context identifiers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod names;
pub mod theme;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::names::*;
    pub use crate::theme::*;
}

pub use prelude::*;
