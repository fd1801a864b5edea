//! Diagnostic logging via `tracing`.
//!
//! Logs go to stderr so stdout stays reserved for reports. `RUST_LOG` wins
//! over the CLI verbosity when set.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::AppError;

/// Map `-v`/`-q` counts to a level name. `0` is `info`.
pub fn level_for(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global stderr subscriber.
pub fn init_logging(verbosity: i8) -> Result<(), AppError> {
    let default_filter = format!("delay_sweep={}", level_for(verbosity));
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .try_init()
        .map_err(|e| AppError::config(format!("Failed to initialize logging: {e}")))?;

    tracing::debug!(level = level_for(verbosity), "logging initialized");
    Ok(())
}
