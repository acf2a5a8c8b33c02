//! Log rendering selected through configuration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How an announcing process renders its log lines on stderr.
///
/// Announcing processes usually run under a supervisor that ships stderr to a
/// log pipeline, but are also run by hand while diagnosing a coordination
/// outage. `auto` picks the rendering from where stderr goes.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// JSON when stderr is redirected, compact lines on a terminal.
    #[default]
    Auto,
    /// One JSON object per event.
    Json,
    /// Single human-readable line per event.
    Compact,
}

impl LogFormat {
    /// Whether events are rendered as JSON, given whether stderr is a
    /// terminal.
    #[must_use]
    pub const fn renders_json(self, stderr_is_terminal: bool) -> bool {
        match self {
            Self::Auto => !stderr_is_terminal,
            Self::Json => true,
            Self::Compact => false,
        }
    }
}

/// Error returned when text names no [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
