//! Capabilities consumed from the coordination-service client.
//!
//! The announcer never talks to the service directly. Connection management,
//! session handling, retry policy and watch delivery all belong to the client
//! behind [`CoordinationClient`]; the announcer only needs background
//! ephemeral creates, guaranteed deletes, and a cached view of a parent's
//! children with change notifications.

use std::sync::Arc;

use thiserror::Error;

/// A child node as reported by a watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildData {
    path: String,
    data: Option<Vec<u8>>,
}

impl ChildData {
    /// Describes a child at `path` with optional cached data.
    #[must_use]
    pub fn new(path: impl Into<String>, data: Option<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Full path of the child.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Data cached alongside the child, when the watch keeps data.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

/// Notification delivered by a children watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A child appeared under the watched parent.
    ChildAdded(ChildData),
    /// A child disappeared from the watched parent.
    ChildRemoved(ChildData),
    /// A child's data changed.
    ChildUpdated(ChildData),
    /// The connection was suspended; the session may still survive.
    ConnectionSuspended,
    /// The connection was lost; ephemeral nodes may already be gone.
    ConnectionLost,
    /// The connection was re-established.
    ConnectionReconnected,
}

/// Receives events for a single children watch.
///
/// Clients deliver events on their own worker threads, concurrently with
/// callers of the announcer.
pub trait WatchListener: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &WatchEvent);
}

/// Live, cached view of one parent's children.
pub trait ChildrenWatch: Send + Sync {
    /// Full paths of the children the watch currently has cached.
    fn current_children(&self) -> Vec<String>;

    /// Stops the watch. No events are delivered once this returns.
    fn close(&self);
}

/// Client operations the announcer relies on.
pub trait CoordinationClient: Send + Sync {
    /// Submits a background, compressed create of an ephemeral node.
    ///
    /// Returns once the request is submitted; the outcome of the create itself
    /// is not reported.
    fn create_ephemeral(&self, path: &str, payload: &[u8]) -> Result<(), CoordinationError>;

    /// Deletes `path`, retrying until the delete is durable or the session
    /// ends.
    ///
    /// A missing node is reported as [`CoordinationError::NoNode`].
    fn delete(&self, path: &str) -> Result<(), CoordinationError>;

    /// Starts a children watch on `parent`, delivering events to `listener`.
    fn watch_children(
        &self,
        parent: &str,
        listener: Arc<dyn WatchListener>,
    ) -> Result<Box<dyn ChildrenWatch>, CoordinationError>;
}

/// Failures reported by the coordination-service client.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// The node addressed by the operation does not exist.
    #[error("node {path} does not exist")]
    NoNode {
        /// Path that was not found.
        path: String,
    },
    /// The session could not be used.
    #[error("coordination session unavailable: {message}")]
    SessionUnavailable {
        /// Client-supplied description.
        message: String,
    },
    /// Any other failure the client could not recover from.
    #[error("coordination client failure: {message}")]
    Client {
        /// Client-supplied description.
        message: String,
        /// Underlying error, when the client exposes one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CoordinationError {
    /// Builds a client failure without an underlying source.
    #[must_use]
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a client failure that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Client {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns `true` when the failure only reports a missing node.
    #[must_use]
    pub const fn is_no_node(&self) -> bool {
        matches!(self, Self::NoNode { .. })
    }
}
