//! Scenario world: an announcer wired to the in-memory coordination service.

use std::cell::RefCell;
use std::sync::Arc;

use crate::memory::MemoryCoordinator;
use crate::{Announcer, AnnouncerError, CoordinationClient};

/// State shared across BDD steps and property tests.
pub struct TestWorld {
    /// In-memory service the announcer talks to.
    pub coordinator: MemoryCoordinator,
    /// Announcer under test.
    pub announcer: Arc<Announcer>,
    last_result: Option<Result<(), AnnouncerError>>,
}

impl TestWorld {
    /// Builds a stopped announcer over an empty service.
    #[must_use]
    pub fn new() -> Self {
        let coordinator = MemoryCoordinator::new();
        let client: Arc<dyn CoordinationClient> = Arc::new(coordinator.clone());
        Self {
            coordinator,
            announcer: Arc::new(Announcer::new(client)),
            last_result: None,
        }
    }

    /// Announces `payload` at `path`, recording the outcome.
    pub fn announce(&mut self, path: &str, payload: &str) {
        self.last_result = Some(self.announcer.announce(path, payload.as_bytes()));
    }

    /// Unannounces `path`, recording the outcome.
    pub fn unannounce(&mut self, path: &str) {
        self.last_result = Some(self.announcer.unannounce(path));
    }

    /// Starts the announcer, recording the outcome.
    pub fn start(&mut self) {
        self.last_result = Some(self.announcer.start());
    }

    /// Stops the announcer, recording the outcome.
    pub fn stop(&mut self) {
        self.last_result = Some(self.announcer.stop());
    }

    /// Returns the outcome of the most recent announcer operation.
    #[must_use]
    pub fn last_result(&self) -> Option<&Result<(), AnnouncerError>> {
        self.last_result.as_ref()
    }

    /// Payloads of every create submitted for `path`, oldest first.
    #[must_use]
    pub fn creates_for(&self, path: &str) -> Vec<Vec<u8>> {
        self.coordinator
            .creates()
            .into_iter()
            .filter(|(created, _)| created == path)
            .map(|(_, payload)| payload)
            .collect()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

/// A world whose announcer has already been started.
#[must_use]
pub fn started_world() -> TestWorld {
    let mut world = TestWorld::new();
    world.start();
    world
}
