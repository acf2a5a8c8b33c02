//! Shared configuration for the herald announcement keeper.
//!
//! Configuration is layered with `ortho_config`: built-in defaults, then an
//! optional configuration file, then `HERALD_*` environment variables, then
//! command-line flags. The resolved [`Config`] carries the logging settings
//! used by telemetry and the coordination-service roots under which servers
//! and their segments are announced.

mod defaults;
mod logging;
mod paths;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ANNOUNCEMENTS_NODE, DEFAULT_BASE_PATH, DEFAULT_LOG_FILTER,
    DEFAULT_SERVED_SEGMENTS_NODE, default_base_path, default_base_path_string,
    default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{AnnouncementPaths, AnnouncementPathsError};

/// Resolved configuration for processes that announce themselves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HERALD")]
pub struct Config {
    /// `tracing` filter expression applied to the global subscriber.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Root node under which every announcement tree lives.
    #[serde(default = "defaults::default_base_path_string")]
    pub base_path: String,
    /// Overrides the root for server self-announcements.
    #[serde(default)]
    pub announcements_path: Option<String>,
    /// Overrides the root for per-server served segment announcements.
    #[serde(default)]
    pub served_segments_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            base_path: defaults::default_base_path_string(),
            announcements_path: None,
            served_segments_path: None,
        }
    }
}

impl Config {
    /// Filter expression for the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for structured logs.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Root node under which announcement trees live.
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.base_path.as_str()
    }

    /// Resolves the announcement roots, applying any explicit overrides.
    ///
    /// # Errors
    ///
    /// Returns [`AnnouncementPathsError`] when a resolved root is not an
    /// absolute coordination-service path.
    pub fn announcement_paths(&self) -> Result<AnnouncementPaths, AnnouncementPathsError> {
        let announcements = self.announcements_path.clone().unwrap_or_else(|| {
            paths::join_root(&self.base_path, defaults::DEFAULT_ANNOUNCEMENTS_NODE)
        });
        let served_segments = self.served_segments_path.clone().unwrap_or_else(|| {
            paths::join_root(&self.base_path, defaults::DEFAULT_SERVED_SEGMENTS_NODE)
        });
        AnnouncementPaths::new(announcements, served_segments)
    }
}
