//! Test suites for the announcer.

mod announcer_behaviour;
mod support;
