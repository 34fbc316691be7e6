//! Logging bootstrap for svckit services.

use crate::config::LoggingSection;
use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber from the logging section of
/// the configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless; later calls are ignored (useful in tests where
/// several components bootstrap independently).
pub fn init(config: &LoggingSection) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
