/// Default log filter expression used by announcing processes.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default root node for every announcement tree.
pub const DEFAULT_BASE_PATH: &str = "/herald";

/// Child of the base path holding server self-announcements.
pub const DEFAULT_ANNOUNCEMENTS_NODE: &str = "announcements";

/// Child of the base path holding per-server served segments.
pub const DEFAULT_SERVED_SEGMENTS_NODE: &str = "servedSegments";

/// Default log filter expression used by announcing processes.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Auto
}

/// Default root node for announcement trees.
#[must_use]
pub const fn default_base_path() -> &'static str {
    DEFAULT_BASE_PATH
}

/// Owned base path used by serde defaults.
#[must_use]
pub fn default_base_path_string() -> String {
    DEFAULT_BASE_PATH.to_owned()
}
