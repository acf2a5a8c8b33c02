//! Descriptors published for a server and its segments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Self-description a data server announces while it is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMetadata {
    /// Unique server name; also the leaf of the server's announcement path.
    pub name: String,
    /// Address clients use to reach the server.
    pub host: String,
    /// Maximum bytes of segments the server will hold.
    pub max_size: u64,
    /// Role of the server, such as `historical` or `realtime`.
    #[serde(rename = "type")]
    pub server_type: String,
    /// Tier the server belongs to.
    pub tier: String,
}

impl ServerMetadata {
    /// Describes a server reachable at `host` with room for `max_size` bytes.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        max_size: u64,
        server_type: impl Into<String>,
        tier: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            max_size,
            server_type: server_type.into(),
            tier: tier.into(),
        }
    }
}

impl fmt::Display for ServerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({}, tier {})", self.name, self.host, self.server_type, self.tier)
    }
}

/// An immutable chunk of a data source covering one time interval.
///
/// Interval bounds and versions are carried as the ISO-8601 strings the
/// segment was built with; they only contribute to the identifier and the
/// published descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSegment {
    /// Data source the segment belongs to.
    pub data_source: String,
    /// Inclusive start of the covered interval.
    pub interval_start: String,
    /// Exclusive end of the covered interval.
    pub interval_end: String,
    /// Build version; newer versions overshadow older ones.
    pub version: String,
    /// Partition number within the interval; `0` for unpartitioned data.
    pub partition: u32,
    /// Size of the segment in bytes.
    pub size: u64,
}

impl DataSegment {
    /// Identifier used as the segment's node name.
    ///
    /// The partition suffix is only present for non-zero partitions, so an
    /// unpartitioned segment keeps the same identifier when a partitioned
    /// sibling appears.
    #[must_use]
    pub fn identifier(&self) -> String {
        let mut identifier = format!(
            "{}_{}_{}_{}",
            self.data_source, self.interval_start, self.interval_end, self.version
        );
        if self.partition != 0 {
            identifier.push('_');
            identifier.push_str(&self.partition.to_string());
        }
        identifier
    }
}
