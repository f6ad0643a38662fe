//! Structured logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{DevServerError, DevServerResult};

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Fails on invalid filter directives or when a subscriber is already set.
pub fn init_logging(settings: &LoggingSettings) -> DevServerResult<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => build_filter(&directives)?,
        _ => build_filter(&settings.level)?,
    };

    if settings.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| DevServerError::server(format!("failed to install logger: {e}")))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| DevServerError::server(format!("failed to install logger: {e}")))?;
    }

    Ok(())
}

/// Parses filter directives such as `info` or `easyauth_middleware=debug,warn`.
pub fn build_filter(directives: &str) -> DevServerResult<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| DevServerError::config(format!("invalid log level {directives:?}: {e}")))
}
