//! Tracing subscriber setup.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directive applied on top of `RUST_LOG`.
pub const DEFAULT_LOG_DIRECTIVE: &str = "boardsound=info";

/// Installs a global `fmt` subscriber filtered by `RUST_LOG` plus
/// `default_directive`.
///
/// Returns `false` when a global subscriber is already set, so calling it
/// more than once is harmless. An unparseable directive is logged and
/// ignored.
pub fn init_tracing(default_directive: &str) -> bool {
    let mut filter = EnvFilter::from_default_env();
    let parsed = default_directive.parse::<Directive>();
    if let Ok(directive) = &parsed {
        filter = filter.add_directive(directive.clone());
    }

    let installed = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_ok();

    if let Err(e) = parsed {
        tracing::warn!("Ignoring log directive '{}': {}", default_directive, e);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(DEFAULT_LOG_DIRECTIVE);
        assert!(!init_tracing(DEFAULT_LOG_DIRECTIVE));
    }

    #[test]
    fn test_default_directive_parses() {
        assert!(DEFAULT_LOG_DIRECTIVE.parse::<Directive>().is_ok());
    }
}
