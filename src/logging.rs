//! Logging initialization from the configuration's logging section.
//!
//! Library code only emits `tracing` events; building the subscriber is the
//! process entry point's job, via [`setup_logging`]. Console output always
//! stays on; a log file from the configuration adds a second, non-blocking
//! layer.
//!
//! `RUST_LOG` takes precedence over the configured level, so a one-off
//! `RUST_LOG=skypeload=trace` works without touching any config file.

use std::fs::OpenOptions;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::{Result, SkypeloadError};

/// Installs the global tracing subscriber.
///
/// Call once at startup, before the pipeline runs. Fails with a
/// [`SkypeloadError::Config`] error when the configured level does not parse
/// or a subscriber is already installed.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.to_lowercase()).map_err(|err| {
            SkypeloadError::config(format!("invalid log level '{}': {err}", config.level))
        })?,
    };

    let console = fmt::layer().with_writer(std::io::stderr);

    match &config.file {
        None => tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init(),
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            // The guard must outlive the process for buffered lines to flush.
            std::mem::forget(guard);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()
        }
    }
    .map_err(|err| SkypeloadError::config(format!("logging already initialized: {err}")))?;

    Ok(())
}
