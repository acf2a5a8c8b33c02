//! In-process coordination service for tests.
//!
//! [`MemoryCoordinator`] keeps nodes in a map and delivers watch events
//! synchronously on the calling thread, after releasing its own lock. Tests
//! drive connection trouble explicitly through the `lose_connection`,
//! `expire_session` and `reconnect` hooks, and inspect the requests the
//! announcer made through [`MemoryCoordinator::calls`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::coordination::{
    ChildData, ChildrenWatch, CoordinationClient, CoordinationError, WatchEvent, WatchListener,
};
use crate::path::split_path;

/// A request received by the in-memory service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    /// Ephemeral create submission.
    Create {
        /// Target path.
        path: String,
        /// Submitted payload.
        payload: Vec<u8>,
    },
    /// Delete request.
    Delete {
        /// Target path.
        path: String,
    },
    /// Children watch registration.
    Watch {
        /// Watched parent.
        parent: String,
    },
}

struct Registration {
    parent: String,
    listener: Arc<dyn WatchListener>,
    cached: BTreeSet<String>,
}

#[derive(Default)]
struct MemoryState {
    nodes: BTreeMap<String, Vec<u8>>,
    watches: BTreeMap<u64, Registration>,
    next_watch: u64,
    watches_opened: usize,
    calls: Vec<ClientCall>,
    fail_create: Option<CoordinationError>,
    fail_delete: Option<CoordinationError>,
    fail_watch: Option<CoordinationError>,
}

type Dispatch = Vec<(Arc<dyn WatchListener>, WatchEvent)>;

impl MemoryState {
    fn child_event(
        &mut self,
        path: &str,
        event: impl Fn(ChildData) -> WatchEvent,
        added: bool,
    ) -> Dispatch {
        let split = split_path(path);
        let data = self.nodes.get(path).cloned();
        self.watches
            .values_mut()
            .filter(|registration| registration.parent == split.parent())
            .filter_map(|registration| {
                let changed = if added {
                    registration.cached.insert(path.to_owned())
                } else {
                    registration.cached.remove(path)
                };
                changed.then(|| {
                    (
                        Arc::clone(&registration.listener),
                        event(ChildData::new(path, data.clone())),
                    )
                })
            })
            .collect()
    }

    fn broadcast(&self, event: &WatchEvent) -> Dispatch {
        self.watches
            .values()
            .map(|registration| (Arc::clone(&registration.listener), event.clone()))
            .collect()
    }

    fn resync(&mut self) -> Dispatch {
        let mut dispatch = Vec::new();
        for registration in self.watches.values_mut() {
            let present: BTreeSet<String> = self
                .nodes
                .keys()
                .filter(|path| split_path(path).parent() == registration.parent)
                .cloned()
                .collect();
            for vanished in registration.cached.difference(&present) {
                dispatch.push((
                    Arc::clone(&registration.listener),
                    WatchEvent::ChildRemoved(ChildData::new(vanished.as_str(), None)),
                ));
            }
            for appeared in present.difference(&registration.cached) {
                dispatch.push((
                    Arc::clone(&registration.listener),
                    WatchEvent::ChildAdded(ChildData::new(
                        appeared.as_str(),
                        self.nodes.get(appeared).cloned(),
                    )),
                ));
            }
            registration.cached = present;
        }
        dispatch
    }
}

/// Coordination service held entirely in memory.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryCoordinator {
    state: Arc<Mutex<MemoryState>>,
}

impl fmt::Debug for MemoryCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryCoordinator")
            .field("nodes", &state.nodes.keys().collect::<Vec<_>>())
            .field("watches", &state.watches.len())
            .field("calls", &state.calls.len())
            .finish_non_exhaustive()
    }
}

impl MemoryCoordinator {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(dispatch: Dispatch) {
        for (listener, event) in dispatch {
            listener.on_event(&event);
        }
    }

    /// Deletes a node as another client would, without recording a call.
    /// Does nothing when the node does not exist.
    pub fn remove_externally(&self, path: &str) {
        let dispatch = {
            let mut state = self.lock();
            if !state.nodes.contains_key(path) {
                return;
            }
            let removal = state.child_event(path, WatchEvent::ChildRemoved, false);
            state.nodes.remove(path);
            removal
        };
        Self::deliver(dispatch);
    }

    /// Creates a node as another client would, without recording a call.
    pub fn create_external(&self, path: &str, payload: &[u8]) {
        let dispatch = {
            let mut state = self.lock();
            state.nodes.insert(path.to_owned(), payload.to_vec());
            state.child_event(path, WatchEvent::ChildAdded, true)
        };
        Self::deliver(dispatch);
    }

    /// Drops `path` from every watch cache without touching the node, as if
    /// the watch had not yet observed it.
    pub fn forget_cached(&self, path: &str) {
        for registration in self.lock().watches.values_mut() {
            registration.cached.remove(path);
        }
    }

    /// Removes every node silently, as an expired session would. Watch caches
    /// keep their stale view until [`MemoryCoordinator::reconnect`].
    pub fn expire_session(&self) {
        self.lock().nodes.clear();
    }

    /// Reports a suspended connection to every watch.
    pub fn suspend_connection(&self) {
        let dispatch = self.lock().broadcast(&WatchEvent::ConnectionSuspended);
        Self::deliver(dispatch);
    }

    /// Reports a lost connection to every watch.
    pub fn lose_connection(&self) {
        let dispatch = self.lock().broadcast(&WatchEvent::ConnectionLost);
        Self::deliver(dispatch);
    }

    /// Reports reconnection, then brings every watch cache back in line with
    /// the stored nodes.
    pub fn reconnect(&self) {
        let reconnected = self.lock().broadcast(&WatchEvent::ConnectionReconnected);
        Self::deliver(reconnected);
        let resynced = self.lock().resync();
        Self::deliver(resynced);
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    /// Create submissions received so far as `(path, payload)` pairs.
    #[must_use]
    pub fn creates(&self) -> Vec<(String, Vec<u8>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ClientCall::Create { path, payload } => Some((path.clone(), payload.clone())),
                ClientCall::Delete { .. } | ClientCall::Watch { .. } => None,
            })
            .collect()
    }

    /// Paths of the delete requests received so far.
    #[must_use]
    pub fn deletes(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ClientCall::Delete { path } => Some(path.clone()),
                ClientCall::Create { .. } | ClientCall::Watch { .. } => None,
            })
            .collect()
    }

    /// Forgets every recorded call, keeping nodes and watches.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Whether a node is present at `path`.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.lock().nodes.contains_key(path)
    }

    /// Payload stored at `path`, if the node exists.
    #[must_use]
    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().nodes.get(path).cloned()
    }

    /// Number of watches currently registered.
    #[must_use]
    pub fn open_watches(&self) -> usize {
        self.lock().watches.len()
    }

    /// Number of watches ever registered, closed ones included.
    #[must_use]
    pub fn watches_opened(&self) -> usize {
        self.lock().watches_opened
    }

    /// Fails the next create submission with `error`.
    pub fn fail_next_create(&self, error: CoordinationError) {
        self.lock().fail_create = Some(error);
    }

    /// Fails the next delete with `error`.
    pub fn fail_next_delete(&self, error: CoordinationError) {
        self.lock().fail_delete = Some(error);
    }

    /// Fails the next watch registration with `error`.
    pub fn fail_next_watch(&self, error: CoordinationError) {
        self.lock().fail_watch = Some(error);
    }
}

impl CoordinationClient for MemoryCoordinator {
    fn create_ephemeral(&self, path: &str, payload: &[u8]) -> Result<(), CoordinationError> {
        let dispatch = {
            let mut state = self.lock();
            state.calls.push(ClientCall::Create {
                path: path.to_owned(),
                payload: payload.to_vec(),
            });
            if let Some(error) = state.fail_create.take() {
                return Err(error);
            }
            // Background creates of an existing node fail without reporting.
            if state.nodes.contains_key(path) {
                return Ok(());
            }
            state.nodes.insert(path.to_owned(), payload.to_vec());
            state.child_event(path, WatchEvent::ChildAdded, true)
        };
        Self::deliver(dispatch);
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), CoordinationError> {
        let dispatch = {
            let mut state = self.lock();
            state.calls.push(ClientCall::Delete {
                path: path.to_owned(),
            });
            if let Some(error) = state.fail_delete.take() {
                return Err(error);
            }
            if !state.nodes.contains_key(path) {
                return Err(CoordinationError::NoNode {
                    path: path.to_owned(),
                });
            }
            let removal = state.child_event(path, WatchEvent::ChildRemoved, false);
            state.nodes.remove(path);
            removal
        };
        Self::deliver(dispatch);
        Ok(())
    }

    fn watch_children(
        &self,
        parent: &str,
        listener: Arc<dyn WatchListener>,
    ) -> Result<Box<dyn ChildrenWatch>, CoordinationError> {
        let mut state = self.lock();
        state.calls.push(ClientCall::Watch {
            parent: parent.to_owned(),
        });
        if let Some(error) = state.fail_watch.take() {
            return Err(error);
        }
        let cached = state
            .nodes
            .keys()
            .filter(|path| split_path(path).parent() == parent)
            .cloned()
            .collect();
        let id = state.next_watch;
        state.next_watch += 1;
        state.watches_opened += 1;
        state.watches.insert(
            id,
            Registration {
                parent: parent.to_owned(),
                listener,
                cached,
            },
        );
        Ok(Box::new(MemoryWatch {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryWatch {
    id: u64,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryWatch {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChildrenWatch for MemoryWatch {
    fn current_children(&self) -> Vec<String> {
        self.lock()
            .watches
            .get(&self.id)
            .map(|registration| registration.cached.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn close(&self) {
        self.lock().watches.remove(&self.id);
    }
}
