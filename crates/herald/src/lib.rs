//! Keeps ephemeral announcements alive in a hierarchical coordination service.
//!
//! An [`Announcer`] publishes named byte payloads as ephemeral nodes and keeps
//! them present for as long as it is started. Ephemeral nodes vanish when the
//! owning session is interrupted or when another client deletes them, so the
//! announcer watches the children of every parent it has published under and
//! recreates anything that disappears:
//!
//! - a removed child that is still announced is recreated straight away with
//!   its stored payload;
//! - on connection loss, every announced child the watch had not yet observed
//!   is remembered, and recreated once the connection comes back.
//!
//! Announcements issued before [`Announcer::start`] are buffered and published
//! in order when the announcer starts. [`Announcer::stop`] closes every watch
//! and deletes everything still announced.
//!
//! The coordination service itself sits behind the [`CoordinationClient`]
//! trait. The `test-support` feature exposes `memory::MemoryCoordinator`, an
//! in-process implementation used by the workspace's behavioural tests.

mod announcer;
mod coordination;
mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod path;
mod store;
pub mod telemetry;
mod watch;

pub use announcer::Announcer;
pub use coordination::{
    ChildData, ChildrenWatch, CoordinationClient, CoordinationError, WatchEvent, WatchListener,
};
pub use error::{AnnouncerError, Operation};
pub use telemetry::TelemetryError;

#[cfg(test)]
mod tests;
