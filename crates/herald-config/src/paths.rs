//! Coordination-service roots under which announcements are published.

use thiserror::Error;

/// Resolved roots for server and served-segment announcements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementPaths {
    announcements: String,
    served_segments: String,
}

impl AnnouncementPaths {
    /// Validates and stores the two announcement roots.
    ///
    /// Trailing separators are dropped so callers can append children with a
    /// single `/`.
    ///
    /// # Errors
    ///
    /// Returns [`AnnouncementPathsError::NotAbsolute`] when either root does
    /// not start with `/`.
    pub fn new(
        announcements: impl Into<String>,
        served_segments: impl Into<String>,
    ) -> Result<Self, AnnouncementPathsError> {
        Ok(Self {
            announcements: validate_root("announcements", announcements.into())?,
            served_segments: validate_root("served_segments", served_segments.into())?,
        })
    }

    /// Root holding one node per announced server.
    #[must_use]
    pub fn announcements(&self) -> &str {
        self.announcements.as_str()
    }

    /// Root holding one child per server, each listing its served segments.
    #[must_use]
    pub fn served_segments(&self) -> &str {
        self.served_segments.as_str()
    }
}

/// Errors raised while resolving announcement roots.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnnouncementPathsError {
    /// The root was relative.
    #[error("{name} root '{value}' must be an absolute path")]
    NotAbsolute {
        /// Which root was invalid.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

fn validate_root(name: &'static str, value: String) -> Result<String, AnnouncementPathsError> {
    if !value.starts_with('/') {
        return Err(AnnouncementPathsError::NotAbsolute { name, value });
    }
    let trimmed = value.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::from("/"));
    }
    Ok(trimmed.to_owned())
}

pub(crate) fn join_root(base: &str, child: &str) -> String {
    format!("{}/{child}", base.trim_end_matches('/'))
}
