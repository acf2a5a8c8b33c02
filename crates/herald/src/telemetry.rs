//! Log output for processes that keep announcements alive.
//!
//! Lifecycle events are emitted under [`ANNOUNCER_TARGET`] and recovery
//! events under [`WATCH_TARGET`], so reinstatement activity can be filtered
//! apart from the host process. [`install`] sets up the process-wide
//! subscriber from a [`Config`].

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use herald_config::Config;

/// Target for announce, unannounce, start and stop events.
pub const ANNOUNCER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::announcer");

/// Target for watch and reinstatement events.
pub const WATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::watch");

const CRATE_TARGET: &str = env!("CARGO_PKG_NAME");

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Errors raised while installing the log subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter expression does not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Expression handed to the subscriber.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// A subscriber installed elsewhere is already active.
    #[error("another log subscriber is already installed: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Filter expression handed to the subscriber for `config`.
///
/// Reinstatements are logged at `info` under [`WATCH_TARGET`]. Unless the
/// configured filter has a directive for this crate or that target, one
/// keeping them visible is appended.
#[must_use]
pub fn filter_directives(config: &Config) -> String {
    let configured = config.log_filter().trim();
    if configured.split(',').any(covers_watch_target) {
        return configured.to_owned();
    }
    let recovery = format!("{WATCH_TARGET}=info");
    if configured.is_empty() {
        recovery
    } else {
        format!("{configured},{recovery}")
    }
}

/// Installs the process-wide subscriber described by `config`.
///
/// Only the first successful call installs anything; later calls return
/// immediately whatever configuration they pass.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter does not parse and
/// [`TelemetryError::Subscriber`] when another subscriber is already set.
pub fn install(config: &Config) -> Result<(), TelemetryError> {
    INSTALLED.get_or_try_init(|| install_subscriber(config))?;
    Ok(())
}

fn covers_watch_target(directive: &str) -> bool {
    let target = directive
        .trim()
        .split(['=', '['])
        .next()
        .unwrap_or_default();
    target == CRATE_TARGET || target == WATCH_TARGET
}

fn build_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    let directives = filter_directives(config);
    EnvFilter::try_new(&directives).map_err(|error| TelemetryError::Filter {
        filter: directives,
        message: error.to_string(),
    })
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let terminal = io::stderr().is_terminal();
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(terminal)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> =
        if config.log_format().renders_json(terminal) {
            Box::new(builder.json().flatten_event(true).finish())
        } else {
            Box::new(builder.compact().finish())
        };
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
