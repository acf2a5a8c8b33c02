//! Server and segment announcement on top of [`herald::Announcer`].

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use herald::path::make_path;
use herald::{Announcer, AnnouncerError};
use herald_config::AnnouncementPaths;
use thiserror::Error;
use tracing::info;

use crate::descriptor::{DataSegment, ServerMetadata};
use crate::serializer::{DescriptorSerializer, JsonDescriptorSerializer, SerializationError};

const SEGMENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::announcer");

/// Failures raised while announcing a server or its segments.
#[derive(Debug, Error)]
pub enum SegmentAnnouncerError {
    /// The descriptor could not be encoded; nothing was announced.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    /// The underlying announcer rejected or failed the request.
    #[error(transparent)]
    Announcer(#[from] AnnouncerError),
}

/// Publishes and withdraws served segments.
pub trait SegmentAnnouncer {
    /// Announces that `segment` is served here.
    ///
    /// # Errors
    ///
    /// Returns an error when the descriptor cannot be encoded or the
    /// announcement is rejected.
    fn announce_segment(&self, segment: &DataSegment) -> Result<(), SegmentAnnouncerError>;

    /// Withdraws the announcement for `segment`.
    ///
    /// # Errors
    ///
    /// Returns an error when the segment was not announced or its node could
    /// not be deleted.
    fn unannounce_segment(&self, segment: &DataSegment) -> Result<(), SegmentAnnouncerError>;
}

/// Segment announcer backed by a shared [`Announcer`].
pub struct CoordinatedSegmentAnnouncer<S = JsonDescriptorSerializer> {
    server: ServerMetadata,
    announcement_path: String,
    served_segments_location: String,
    announcer: Arc<Announcer>,
    serializer: S,
    started: Mutex<bool>,
}

impl<S> fmt::Debug for CoordinatedSegmentAnnouncer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatedSegmentAnnouncer")
            .field("server", &self.server.name)
            .field("announcement_path", &self.announcement_path)
            .field("served_segments_location", &self.served_segments_location)
            .finish_non_exhaustive()
    }
}

impl CoordinatedSegmentAnnouncer {
    /// Builds an announcer that publishes JSON descriptors.
    #[must_use]
    pub fn with_json(
        server: ServerMetadata,
        paths: &AnnouncementPaths,
        announcer: Arc<Announcer>,
    ) -> Self {
        Self::new(server, paths, announcer, JsonDescriptorSerializer)
    }
}

impl<S: DescriptorSerializer> CoordinatedSegmentAnnouncer<S> {
    /// Builds an announcer for `server` under the configured roots.
    #[must_use]
    pub fn new(
        server: ServerMetadata,
        paths: &AnnouncementPaths,
        announcer: Arc<Announcer>,
        serializer: S,
    ) -> Self {
        let announcement_path = make_path(paths.announcements(), &server.name);
        let served_segments_location = make_path(paths.served_segments(), &server.name);
        Self {
            server,
            announcement_path,
            served_segments_location,
            announcer,
            serializer,
            started: Mutex::new(false),
        }
    }

    /// Announces the server's own descriptor. Does nothing when already
    /// started.
    ///
    /// # Errors
    ///
    /// Returns an error when the descriptor cannot be encoded or announced;
    /// the announcer then stays stopped.
    pub fn start(&self) -> Result<(), SegmentAnnouncerError> {
        let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        if *started {
            return Ok(());
        }
        let payload = self.serializer.server_bytes(&self.server)?;
        info!(
            target: SEGMENTS_TARGET,
            server = %self.server,
            path = %self.announcement_path,
            "announcing self"
        );
        self.announcer.announce(&self.announcement_path, payload)?;
        *started = true;
        Ok(())
    }

    /// Withdraws the server's own descriptor. Does nothing when not started.
    ///
    /// Segment announcements are left to their owner.
    ///
    /// # Errors
    ///
    /// Returns an error when the descriptor cannot be unannounced; the
    /// announcer then stays started.
    pub fn stop(&self) -> Result<(), SegmentAnnouncerError> {
        let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        if !*started {
            return Ok(());
        }
        info!(
            target: SEGMENTS_TARGET,
            server = %self.server.name,
            "withdrawing server announcement"
        );
        self.announcer.unannounce(&self.announcement_path)?;
        *started = false;
        Ok(())
    }

    /// Path at which `segment` is announced.
    #[must_use]
    pub fn segment_path(&self, segment: &DataSegment) -> String {
        make_path(&self.served_segments_location, &segment.identifier())
    }

    /// Path of this server's own announcement.
    #[must_use]
    pub fn announcement_path(&self) -> &str {
        self.announcement_path.as_str()
    }
}

impl<S: DescriptorSerializer> SegmentAnnouncer for CoordinatedSegmentAnnouncer<S> {
    fn announce_segment(&self, segment: &DataSegment) -> Result<(), SegmentAnnouncerError> {
        let path = self.segment_path(segment);
        let payload = self.serializer.segment_bytes(segment)?;
        info!(
            target: SEGMENTS_TARGET,
            segment = %segment.identifier(),
            path = %path,
            "announcing segment"
        );
        self.announcer.announce(&path, payload)?;
        Ok(())
    }

    fn unannounce_segment(&self, segment: &DataSegment) -> Result<(), SegmentAnnouncerError> {
        let path = self.segment_path(segment);
        info!(
            target: SEGMENTS_TARGET,
            segment = %segment.identifier(),
            path = %path,
            "unannouncing segment"
        );
        self.announcer.unannounce(&path)?;
        Ok(())
    }
}
