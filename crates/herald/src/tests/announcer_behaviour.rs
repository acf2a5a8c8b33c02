//! Behavioural tests for the announcer lifecycle and recovery.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::AnnouncerError;

use super::support::{self, TestWorld};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a stopped announcer")]
fn given_stopped(world: &RefCell<TestWorld>) {
    assert!(!world.borrow().announcer.is_started());
}

#[given("a started announcer")]
fn given_started(world: &RefCell<TestWorld>) -> StepResult {
    let mut state = world.borrow_mut();
    state.start();
    match state.last_result() {
        Some(Ok(())) => Ok(()),
        other => Err(format!("start failed: {other:?}")),
    }
}

#[given("\"{path}\" is announced with \"{payload}\"")]
fn given_announced(world: &RefCell<TestWorld>, path: String, payload: String) -> StepResult {
    let mut state = world.borrow_mut();
    state.announce(&path, &payload);
    match state.last_result() {
        Some(Ok(())) => Ok(()),
        other => Err(format!("announcing {path} failed: {other:?}")),
    }
}

#[when("\"{path}\" is announced with \"{payload}\"")]
fn when_announced(world: &RefCell<TestWorld>, path: String, payload: String) {
    world.borrow_mut().announce(&path, &payload);
}

#[when("\"{path}\" is unannounced")]
fn when_unannounced(world: &RefCell<TestWorld>, path: String) {
    world.borrow_mut().unannounce(&path);
}

#[when("the announcer starts")]
fn when_starts(world: &RefCell<TestWorld>) {
    world.borrow_mut().start();
}

#[when("the announcer stops")]
fn when_stops(world: &RefCell<TestWorld>) {
    let mut state = world.borrow_mut();
    state.coordinator.clear_calls();
    state.stop();
}

#[when("another client deletes \"{path}\"")]
fn when_deleted_externally(world: &RefCell<TestWorld>, path: String) {
    world.borrow().coordinator.remove_externally(&path);
}

#[when("the watch has not observed \"{path}\"")]
fn when_not_observed(world: &RefCell<TestWorld>, path: String) {
    world.borrow().coordinator.forget_cached(&path);
}

#[when("the connection is lost")]
fn when_connection_lost(world: &RefCell<TestWorld>) {
    world.borrow().coordinator.lose_connection();
}

#[when("the connection is re-established")]
fn when_reconnected(world: &RefCell<TestWorld>) {
    world.borrow().coordinator.reconnect();
}

#[then("the operation succeeds")]
fn then_succeeds(world: &RefCell<TestWorld>) -> StepResult {
    match world.borrow().last_result() {
        Some(Ok(())) => Ok(()),
        other => Err(format!("expected success, got {other:?}")),
    }
}

#[then("the operation fails as a duplicate announcement")]
fn then_duplicate(world: &RefCell<TestWorld>) -> StepResult {
    match world.borrow().last_result() {
        Some(Err(AnnouncerError::DuplicateAnnouncement { .. })) => Ok(()),
        other => Err(format!("expected duplicate announcement, got {other:?}")),
    }
}

#[then("the operation fails as an unknown announcement")]
fn then_unknown(world: &RefCell<TestWorld>) -> StepResult {
    match world.borrow().last_result() {
        Some(Err(AnnouncerError::UnknownAnnouncement { .. })) => Ok(()),
        other => Err(format!("expected unknown announcement, got {other:?}")),
    }
}

#[then("the coordination service received no requests")]
fn then_no_requests(world: &RefCell<TestWorld>) {
    let calls = world.borrow().coordinator.calls();
    assert!(calls.is_empty(), "unexpected requests: {calls:?}");
}

#[then("the coordination service received no further requests")]
fn then_no_further_requests(world: &RefCell<TestWorld>) {
    let calls = world.borrow().coordinator.calls();
    assert!(calls.is_empty(), "stop repeated requests: {calls:?}");
}

#[then("\"{path}\" exists with \"{payload}\"")]
fn then_exists(world: &RefCell<TestWorld>, path: String, payload: String) {
    let data = world.borrow().coordinator.data(&path);
    assert_eq!(data.as_deref(), Some(payload.as_bytes()));
}

#[then("\"{path}\" no longer exists")]
fn then_gone(world: &RefCell<TestWorld>, path: String) {
    assert!(
        !world.borrow().coordinator.exists(&path),
        "{path} should have been removed"
    );
}

#[then("\"{path}\" was recreated once with \"{payload}\"")]
fn then_recreated_once(world: &RefCell<TestWorld>, path: String, payload: String) -> StepResult {
    let creates = world.borrow().creates_for(&path);
    if creates.len() != 2 {
        return Err(format!(
            "expected one recreation of {path}, saw {} creates",
            creates.len()
        ));
    }
    if creates.iter().all(|created| created == payload.as_bytes()) {
        Ok(())
    } else {
        Err(format!("{path} recreated with a different payload: {creates:?}"))
    }
}

#[then("\"{path}\" was recreated {count} times")]
fn then_recreated_times(world: &RefCell<TestWorld>, path: String, count: usize) {
    let creates = world.borrow().creates_for(&path);
    assert_eq!(creates.len(), count + 1, "creates for {path}: {creates:?}");
}

#[then("no watches remain open")]
fn then_no_watches(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().coordinator.open_watches(), 0);
}

#[scenario(path = "tests/features/announcer_lifecycle.feature")]
fn announcer_lifecycle(world: RefCell<TestWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}

#[scenario(path = "tests/features/announcement_recovery.feature")]
fn announcement_recovery(world: RefCell<TestWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}
