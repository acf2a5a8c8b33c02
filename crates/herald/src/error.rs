//! Errors surfaced by the announcer.

use std::fmt;

use thiserror::Error;

use crate::coordination::CoordinationError;

/// Coordination-service operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Ephemeral node creation.
    Create,
    /// Guaranteed node deletion.
    Delete,
    /// Children watch setup.
    Watch,
}

impl fmt::Display for Operation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Watch => "watch",
        };
        formatter.write_str(label)
    }
}

/// Failures returned by [`crate::Announcer`] operations.
#[derive(Debug, Error)]
pub enum AnnouncerError {
    /// The path is already announced.
    #[error("already announcing {path}, cannot announce it twice")]
    DuplicateAnnouncement {
        /// Path that was announced twice.
        path: String,
    },
    /// The path is not currently announced.
    #[error("path {path} not announced, cannot unannounce")]
    UnknownAnnouncement {
        /// Path that was not announced.
        path: String,
    },
    /// The path is not absolute, has an empty segment or names no node.
    #[error("path '{path}' is not an absolute path to a node")]
    InvalidPath {
        /// Offending path.
        path: String,
    },
    /// The coordination-service client failed and could not recover.
    #[error("coordination service failed to {operation} {path}: {source}")]
    Coordination {
        /// Operation that failed.
        operation: Operation,
        /// Path the operation targeted.
        path: String,
        /// Error reported by the client.
        #[source]
        source: CoordinationError,
    },
    /// A thread panicked while holding the lifecycle lock.
    #[error("announcer lifecycle lock poisoned")]
    LifecyclePoisoned,
}

impl AnnouncerError {
    pub(crate) fn coordination(
        operation: Operation,
        path: impl Into<String>,
        source: CoordinationError,
    ) -> Self {
        Self::Coordination {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Path associated with the failure, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::DuplicateAnnouncement { path }
            | Self::UnknownAnnouncement { path }
            | Self::InvalidPath { path }
            | Self::Coordination { path, .. } => Some(path.as_str()),
            Self::LifecyclePoisoned => None,
        }
    }
}
