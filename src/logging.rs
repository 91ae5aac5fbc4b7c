//! Logging setup using tracing
//!
//! Log lines go to stderr so command output on stdout stays clean. Filtering
//! follows `RUST_LOG` and defaults to `warn`, which still surfaces stale-cache
//! fallbacks and absorbed storage errors.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid
const DEFAULT_FILTER: &str = "warn";

/// Initializes the global tracing subscriber
///
/// # Errors
/// Returns an error if a subscriber has already been installed
pub fn init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
}
