//! Per-parent watch that reinstates announcements the service dropped.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::coordination::{
    ChildData, ChildrenWatch, CoordinationClient, CoordinationError, WatchEvent, WatchListener,
};
use crate::path::{make_path, split_path};
use crate::store::{LeafMap, Payload};
use crate::telemetry::WATCH_TARGET;

/// Watch over one parent's children.
///
/// The watch shares its parent's leaf map with the store, so recovery always
/// replays the payload that is announced at the moment of recovery.
pub(crate) struct ParentWatch {
    parent: String,
    leaves: Arc<LeafMap>,
    client: Arc<dyn CoordinationClient>,
    handle: Mutex<Option<Box<dyn ChildrenWatch>>>,
    // Leaves announced but not seen by the watch when the connection dropped.
    lost: Mutex<Option<HashSet<String>>>,
    closed: AtomicBool,
}

impl fmt::Debug for ParentWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentWatch")
            .field("parent", &self.parent)
            .field("leaves", &self.leaves.len())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ParentWatch {
    /// Starts watching `parent`, registering the new watch as the listener.
    pub(crate) fn open(
        parent: &str,
        leaves: Arc<LeafMap>,
        client: Arc<dyn CoordinationClient>,
    ) -> Result<Arc<Self>, CoordinationError> {
        let watch = Arc::new(Self {
            parent: parent.to_owned(),
            leaves,
            client,
            handle: Mutex::new(None),
            lost: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        let listener: Arc<dyn WatchListener> = watch.clone();
        let handle = watch.client.watch_children(parent, listener)?;
        *lock(&watch.handle) = Some(handle);
        debug!(target: WATCH_TARGET, parent, "watching parent");
        Ok(watch)
    }

    /// Closes the underlying watch and discards any pending lost set.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let taken = lock(&self.handle).take();
        if let Some(handle) = taken {
            handle.close();
        }
        lock(&self.lost).take();
        debug!(target: WATCH_TARGET, parent = %self.parent, "closed parent watch");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn child_removed(&self, child: &ChildData) {
        let split = split_path(child.path());
        let Some(payload) = self.current_payload(split.node()) else {
            return;
        };
        info!(
            target: WATCH_TARGET,
            path = child.path(),
            "node dropped, reinstating"
        );
        self.reinstate(child.path(), &payload);
    }

    fn connection_lost(&self) {
        let observed: HashSet<String> = {
            let handle = lock(&self.handle);
            handle
                .as_ref()
                .map(|watch| watch.current_children())
                .unwrap_or_default()
                .iter()
                .map(|path| split_path(path).node().to_owned())
                .collect()
        };
        let missing: HashSet<String> = self
            .leaves
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|leaf| !observed.contains(leaf))
            .collect();
        if missing.is_empty() {
            return;
        }

        let mut lost = lock(&self.lost);
        if lost.is_some() {
            warn!(
                target: WATCH_TARGET,
                parent = %self.parent,
                missing = missing.len(),
                "lost set already recorded, ignoring overlapping connection loss"
            );
            return;
        }
        debug!(
            target: WATCH_TARGET,
            parent = %self.parent,
            missing = missing.len(),
            "recording announcements missing from watch"
        );
        *lost = Some(missing);
    }

    fn connection_reconnected(&self) {
        let Some(lost) = lock(&self.lost).take() else {
            return;
        };
        for leaf in lost {
            // The store may have changed since the loss was recorded.
            let Some(payload) = self.current_payload(&leaf) else {
                continue;
            };
            let path = make_path(&self.parent, &leaf);
            info!(target: WATCH_TARGET, path = %path, "reinstating");
            self.reinstate(&path, &payload);
        }
    }

    fn current_payload(&self, leaf: &str) -> Option<Payload> {
        self.leaves.get(leaf).map(|entry| Arc::clone(entry.value()))
    }

    fn reinstate(&self, path: &str, payload: &Payload) {
        if self.is_closed() {
            return;
        }
        if let Err(error) = self.client.create_ephemeral(path, payload) {
            warn!(
                target: WATCH_TARGET,
                path,
                error = %error,
                "failed to submit reinstatement"
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn lost_leaves(&self) -> Option<HashSet<String>> {
        lock(&self.lost).clone()
    }
}

impl WatchListener for ParentWatch {
    fn on_event(&self, event: &WatchEvent) {
        if self.is_closed() {
            return;
        }
        debug!(target: WATCH_TARGET, parent = %self.parent, event = ?event, "watch event");
        match event {
            WatchEvent::ChildRemoved(child) => self.child_removed(child),
            WatchEvent::ConnectionLost => self.connection_lost(),
            WatchEvent::ConnectionReconnected => self.connection_reconnected(),
            WatchEvent::ChildAdded(_)
            | WatchEvent::ChildUpdated(_)
            | WatchEvent::ConnectionSuspended => {}
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
