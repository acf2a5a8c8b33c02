//! Shared harness for the announcer test suites.

mod world;

pub use world::{TestWorld, started_world, world};
