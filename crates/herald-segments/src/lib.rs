//! Announces a data server and the segments it serves.
//!
//! A [`CoordinatedSegmentAnnouncer`] publishes the server's own descriptor at
//! `{announcements}/{server}` while started, and one node per served segment
//! at `{served_segments}/{server}/{segment}`. Nodes are kept alive by a shared
//! [`herald::Announcer`]; descriptors are encoded by an injected
//! [`DescriptorSerializer`]. [`bootstrap()`] wires all of this up from a
//! [`herald_config::Config`].

mod announcer;
mod bootstrap;
mod descriptor;
mod serializer;

pub use announcer::{CoordinatedSegmentAnnouncer, SegmentAnnouncer, SegmentAnnouncerError};
pub use bootstrap::{BootstrapError, ServerAnnouncements, bootstrap};
pub use descriptor::{DataSegment, ServerMetadata};
pub use serializer::{DescriptorSerializer, JsonDescriptorSerializer, SerializationError};

#[cfg(test)]
mod tests;
