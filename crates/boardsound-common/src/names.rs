//! Logical sound names.
//!
//! Callers refer to clips by camel-case logical names (`move`, `genericNotify`,
//! `countDown3`). Asset files use the same name with the first character
//! upper-cased.

/// Board-event clips suppressed in music and speech modes.
pub const BOARD_EVENTS: [&str; 3] = ["move", "capture", "check"];

/// Clip played at the end of a countdown.
pub const GENERIC_NOTIFY: &str = "genericNotify";

/// Returns true for clips that are silenced in music and speech modes.
#[must_use]
pub fn is_board_event(name: &str) -> bool {
    BOARD_EVENTS.contains(&name)
}

/// Logical name of the clip announcing `count` during a countdown.
#[must_use]
pub fn countdown_name(count: u32) -> String {
    format!("countDown{count}")
}

/// Upper-cases the first character of a logical name.
#[must_use]
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
