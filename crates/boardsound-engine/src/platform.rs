//! Host platform seams.
//!
//! The engine never talks to a window, a microphone or a notification banner
//! directly. Hosts implement these traits; [`StaticPlatform`] and
//! [`LoggingNotice`] cover headless use and tests.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use boardsound_common::Theme;

/// Facts about the host environment.
pub trait Platform: Send + Sync {
    /// Whether the host is iOS, whose utterance lifecycle events are
    /// unreliable.
    fn is_ios(&self) -> bool;

    /// Whether the client window has focus.
    fn has_focus(&self) -> bool;

    /// BCP 47 language of the page, used for translated utterances.
    fn page_language(&self) -> String;
}

/// Fixed platform facts with a toggleable focus flag.
#[derive(Debug)]
pub struct StaticPlatform {
    ios: bool,
    focused: AtomicBool,
    language: String,
}

impl Default for StaticPlatform {
    fn default() -> Self {
        Self::new("en-US")
    }
}

impl StaticPlatform {
    /// Focused, non-iOS platform with the given page language.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            ios: false,
            focused: AtomicBool::new(true),
            language: language.into(),
        }
    }

    /// Reports iOS.
    #[must_use]
    pub fn with_ios(mut self, ios: bool) -> Self {
        self.ios = ios;
        self
    }

    /// Changes the focus flag.
    pub fn set_focus(&self, focused: bool) {
        self.focused.store(focused, Ordering::Relaxed);
    }
}

impl Platform for StaticPlatform {
    fn is_ios(&self) -> bool {
        self.ios
    }

    fn has_focus(&self) -> bool {
        self.focused.load(Ordering::Relaxed)
    }

    fn page_language(&self) -> String {
        self.language.clone()
    }
}

/// A microphone that must be quiet while the engine speaks.
pub trait Microphone: Send + Sync {
    /// Stops listening.
    fn pause(&self);

    /// Starts listening again.
    fn resume(&self);
}

/// One-time prompt asking the user to allow audio.
pub trait AutoplayNotice: Send + Sync {
    /// Shows the prompt. Repeated calls while shown are no-ops.
    fn show(&self);

    /// Hides the prompt if shown.
    fn hide(&self);
}

/// Notice that logs a warning the first time it is shown.
#[derive(Debug, Default)]
pub struct LoggingNotice {
    shown: AtomicBool,
}

impl LoggingNotice {
    /// Creates a hidden notice.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the notice is currently shown.
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.shown.load(Ordering::Relaxed)
    }
}

impl AutoplayNotice for LoggingNotice {
    fn show(&self) {
        if !self.shown.swap(true, Ordering::Relaxed) {
            warn!("Audio is blocked until the user interacts with the page");
        }
    }

    fn hide(&self) {
        self.shown.store(false, Ordering::Relaxed);
    }
}

/// Host hook re-triggered after a theme change, for theme-specific ambient
/// audio.
pub trait AmbientHook: Send + Sync {
    /// Called once the new theme is active.
    fn theme_applied(&self, theme: &Theme);
}
