//! Tracing subscriber initialisation.
//!
//! Only hosts call [`init_logging`]; `dustbind-core` only *emits* spans and
//! events.
//!
//! # Level mapping
//!
//! | `debug` | `debugLevel` | Filter level |
//! |---------|--------------|--------------|
//! | false   | (any)        | WARN         |
//! | true    | DEBUG        | DEBUG        |
//! | true    | INFO         | INFO         |
//! | true    | WARN         | WARN         |
//! | true    | ERROR        | ERROR        |
//!
//! `RUST_LOG` overrides all of the above if set.

use std::io::IsTerminal as _;

use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

use dustbind_core::domain::EngineSettings;

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already set; hosts that initialise more than
/// once may ignore the error.
pub fn init_logging(settings: &EngineSettings) -> Result<(), TryInitError> {
    let level = derive_level(settings);

    // `dustbind` prefixes every crate target and the engine's own target.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dustbind={level}")));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
}

fn derive_level(settings: &EngineSettings) -> &'static str {
    if settings.debug {
        settings.debug_level.as_filter()
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustbind_core::domain::DebugLevel;

    fn settings(debug: bool, debug_level: DebugLevel) -> EngineSettings {
        EngineSettings {
            debug,
            debug_level,
            ..EngineSettings::default()
        }
    }

    #[test]
    fn debug_off_logs_warnings() {
        assert_eq!(derive_level(&settings(false, DebugLevel::Debug)), "warn");
    }

    #[test]
    fn debug_on_follows_level() {
        assert_eq!(derive_level(&settings(true, DebugLevel::Debug)), "debug");
        assert_eq!(derive_level(&settings(true, DebugLevel::Error)), "error");
    }

    #[test]
    fn second_init_fails_quietly() {
        let _ = init_logging(&EngineSettings::default());
        assert!(init_logging(&EngineSettings::default()).is_err());
    }
}
