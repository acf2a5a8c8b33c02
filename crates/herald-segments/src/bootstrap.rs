//! Bringing a data server's announcements up from configuration.

use std::sync::Arc;

use herald::telemetry;
use herald::{Announcer, AnnouncerError, CoordinationClient, TelemetryError};
use herald_config::{AnnouncementPathsError, Config};
use thiserror::Error;
use tracing::info;

use crate::announcer::{CoordinatedSegmentAnnouncer, SegmentAnnouncerError};
use crate::descriptor::ServerMetadata;

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Errors surfaced while bringing announcements up or down.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Logging could not be installed.
    #[error("failed to install logging: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A configured announcement root is unusable.
    #[error("invalid announcement roots: {source}")]
    Paths {
        /// Underlying validation error.
        #[source]
        source: AnnouncementPathsError,
    },
    /// The announcer could not start or stop.
    #[error("announcer failed: {source}")]
    Announcer {
        /// Underlying announcer error.
        #[source]
        source: AnnouncerError,
    },
    /// The server announcement could not be published or withdrawn.
    #[error("server announcement failed: {source}")]
    Server {
        /// Underlying segment announcer error.
        #[source]
        source: SegmentAnnouncerError,
    },
}

/// A server whose announcements are being kept alive.
#[derive(Debug)]
pub struct ServerAnnouncements {
    announcer: Arc<Announcer>,
    segments: CoordinatedSegmentAnnouncer,
}

impl ServerAnnouncements {
    /// Segment announcer for this server.
    #[must_use]
    pub const fn segments(&self) -> &CoordinatedSegmentAnnouncer {
        &self.segments
    }

    /// Announcer keeping this server's nodes alive.
    #[must_use]
    pub const fn announcer(&self) -> &Arc<Announcer> {
        &self.announcer
    }

    /// Withdraws the server announcement, then stops the announcer, deleting
    /// any segment nodes still announced.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Server`] when the server announcement cannot
    /// be withdrawn, leaving the announcer running, and
    /// [`BootstrapError::Announcer`] when stopping fails.
    pub fn shutdown(&self) -> Result<(), BootstrapError> {
        self.segments
            .stop()
            .map_err(|source| BootstrapError::Server { source })?;
        self.announcer
            .stop()
            .map_err(|source| BootstrapError::Announcer { source })
    }
}

/// Installs logging, starts an announcer over `client` and announces `server`
/// under the roots resolved from `config`.
///
/// # Errors
///
/// Returns a [`BootstrapError`] naming the step that failed. When the server
/// cannot be announced the announcer is stopped again before returning.
pub fn bootstrap(
    config: &Config,
    server: ServerMetadata,
    client: Arc<dyn CoordinationClient>,
) -> Result<ServerAnnouncements, BootstrapError> {
    telemetry::install(config).map_err(|source| BootstrapError::Telemetry { source })?;
    let paths = config
        .announcement_paths()
        .map_err(|source| BootstrapError::Paths { source })?;

    let announcer = Arc::new(Announcer::new(client));
    announcer
        .start()
        .map_err(|source| BootstrapError::Announcer { source })?;

    let segments = CoordinatedSegmentAnnouncer::with_json(server, &paths, Arc::clone(&announcer));
    if let Err(source) = segments.start() {
        announcer
            .stop()
            .map_err(|error| BootstrapError::Announcer { source: error })?;
        return Err(BootstrapError::Server { source });
    }
    info!(
        target: BOOTSTRAP_TARGET,
        announcement = segments.announcement_path(),
        served_segments = paths.served_segments(),
        "server announcements running"
    );
    Ok(ServerAnnouncements {
        announcer,
        segments,
    })
}
