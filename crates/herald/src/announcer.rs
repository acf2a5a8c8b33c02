//! Lifecycle and bookkeeping for announced ephemeral nodes.

use std::fmt;
use std::mem;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::coordination::{CoordinationClient, CoordinationError};
use crate::error::{AnnouncerError, Operation};
use crate::path::{PathAndNode, SEPARATOR, make_path, split_path};
use crate::store::{AnnouncementStore, Payload};
use crate::telemetry::ANNOUNCER_TARGET;
use crate::watch::ParentWatch;

#[derive(Debug, Default)]
struct Lifecycle {
    started: bool,
    // Announcements made before start, in call order.
    pending: Vec<Pending>,
}

#[derive(Debug)]
struct Pending {
    path: String,
    split: PathAndNode,
    payload: Payload,
}

/// Announces ephemeral nodes and keeps them present while started.
///
/// The announcer is shared by reference between threads. Watch callbacks from
/// the coordination client run concurrently with `announce`, `unannounce`,
/// `start` and `stop`.
///
/// # Examples
///
/// ```rust,ignore
/// let announcer = Announcer::new(client);
/// announcer.announce("/services/api/node-1", b"{\"port\":8080}".to_vec())?;
/// announcer.start()?;
/// // ...
/// announcer.stop()?;
/// ```
pub struct Announcer {
    client: Arc<dyn CoordinationClient>,
    lifecycle: RwLock<Lifecycle>,
    store: AnnouncementStore,
    watches: DashMap<String, Arc<ParentWatch>>,
}

impl fmt::Debug for Announcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Announcer")
            .field("started", &self.is_started())
            .field("announced", &self.store.len())
            .field("parents", &self.store.parent_count())
            .field("watches", &self.watches.len())
            .finish_non_exhaustive()
    }
}

impl Announcer {
    /// Creates a stopped announcer that publishes through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn CoordinationClient>) -> Self {
        Self {
            client,
            lifecycle: RwLock::new(Lifecycle::default()),
            store: AnnouncementStore::default(),
            watches: DashMap::new(),
        }
    }

    /// Starts the announcer and publishes everything announced beforehand.
    ///
    /// Buffered announcements are published in the order they were made.
    /// Every buffered entry is attempted; the first failure is returned once
    /// the rest have been tried. Starting a started announcer does nothing.
    ///
    /// # Errors
    ///
    /// Returns the first [`AnnouncerError`] raised while publishing a buffered
    /// announcement, or [`AnnouncerError::LifecyclePoisoned`].
    pub fn start(&self) -> Result<(), AnnouncerError> {
        let mut lifecycle = self.write_lifecycle()?;
        if lifecycle.started {
            return Ok(());
        }
        lifecycle.started = true;
        let pending = mem::take(&mut lifecycle.pending);
        info!(
            target: ANNOUNCER_TARGET,
            buffered = pending.len(),
            "starting announcer"
        );

        let mut first_error = None;
        for entry in pending {
            if let Err(error) = self.publish(&entry.path, &entry.split, &entry.payload) {
                warn!(
                    target: ANNOUNCER_TARGET,
                    path = %entry.path,
                    error = %error,
                    "failed to publish buffered announcement"
                );
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stops the announcer, closing every watch and deleting every node.
    ///
    /// Watches are closed before anything is deleted so that the deletions are
    /// not mistaken for losses. The store is emptied, so a later
    /// [`Announcer::start`] begins with nothing announced. Stopping a stopped
    /// announcer does nothing.
    ///
    /// # Errors
    ///
    /// Returns the first deletion failure other than a missing node, after
    /// every deletion has been attempted.
    pub fn stop(&self) -> Result<(), AnnouncerError> {
        let mut lifecycle = self.write_lifecycle()?;
        if !lifecycle.started {
            return Ok(());
        }
        lifecycle.started = false;
        info!(target: ANNOUNCER_TARGET, "stopping announcer");

        let watches: Vec<Arc<ParentWatch>> = self
            .watches
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.watches.clear();
        for watch in watches {
            watch.close();
        }

        let mut first_error = None;
        for (parent, leaves) in self.store.drain() {
            for leaf in leaves {
                let path = make_path(&parent, &leaf);
                if let Err(error) = self.delete_node(&path) {
                    first_error.get_or_insert(error);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Announces `payload` at `path`.
    ///
    /// Before [`Announcer::start`] the announcement is buffered. Once started
    /// the parent is watched (at most one watch per parent), the payload is
    /// recorded and an ephemeral create is submitted.
    ///
    /// # Errors
    ///
    /// - [`AnnouncerError::InvalidPath`] when `path` is not absolute, has an
    ///   empty segment or names no node.
    /// - [`AnnouncerError::DuplicateAnnouncement`] when `path` is already
    ///   announced; the original payload stays in place.
    /// - [`AnnouncerError::Coordination`] when the watch cannot be opened or
    ///   the create cannot be submitted.
    pub fn announce(&self, path: &str, payload: impl Into<Vec<u8>>) -> Result<(), AnnouncerError> {
        let split = split_leaf(path)?;
        let bytes: Payload = Arc::from(payload.into());
        loop {
            {
                let lifecycle = self.read_lifecycle()?;
                if lifecycle.started {
                    return self.publish(path, &split, &bytes);
                }
            }
            let mut lifecycle = self.write_lifecycle()?;
            if !lifecycle.started {
                debug!(target: ANNOUNCER_TARGET, path, "buffering announcement until start");
                lifecycle.pending.push(Pending {
                    path: path.to_owned(),
                    split,
                    payload: bytes,
                });
                return Ok(());
            }
            // Started between releasing the read lock and taking the write lock.
        }
    }

    /// Withdraws the announcement at `path` and deletes its node.
    ///
    /// The node is forgotten before it is deleted, so the watch does not
    /// recreate it. A node that is already gone counts as success.
    ///
    /// # Errors
    ///
    /// - [`AnnouncerError::InvalidPath`] when `path` could never have been
    ///   announced.
    /// - [`AnnouncerError::UnknownAnnouncement`] when `path` is not
    ///   announced.
    /// - [`AnnouncerError::Coordination`] when the delete fails for any other
    ///   reason than the node being missing.
    pub fn unannounce(&self, path: &str) -> Result<(), AnnouncerError> {
        info!(target: ANNOUNCER_TARGET, path, "unannouncing");
        let split = split_leaf(path)?;
        if self.store.remove(split.parent(), split.node()).is_none() {
            return Err(AnnouncerError::UnknownAnnouncement {
                path: path.to_owned(),
            });
        }
        self.delete_node(path)
    }

    /// Returns `true` between a successful [`Announcer::start`] and the next
    /// [`Announcer::stop`].
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.lifecycle
            .read()
            .map(|lifecycle| lifecycle.started)
            .unwrap_or(false)
    }

    /// Returns `true` when `path` is currently announced and maintained.
    ///
    /// Buffered announcements are not reported until the announcer starts.
    #[must_use]
    pub fn is_announced(&self, path: &str) -> bool {
        split_leaf(path).is_ok_and(|split| self.store.contains(split.parent(), split.node()))
    }

    #[cfg(test)]
    pub(crate) fn recorded_parents(&self) -> usize {
        self.store.parent_count()
    }

    fn publish(
        &self,
        path: &str,
        split: &PathAndNode,
        payload: &Payload,
    ) -> Result<(), AnnouncerError> {
        self.ensure_watch(split.parent())?;

        if !self
            .store
            .insert(split.parent(), split.node(), Arc::clone(payload))
        {
            return Err(AnnouncerError::DuplicateAnnouncement {
                path: path.to_owned(),
            });
        }

        debug!(target: ANNOUNCER_TARGET, path, "creating ephemeral node");
        if let Err(source) = self.client.create_ephemeral(path, payload) {
            self.store.remove(split.parent(), split.node());
            return Err(AnnouncerError::coordination(Operation::Create, path, source));
        }
        Ok(())
    }

    fn ensure_watch(&self, parent: &str) -> Result<(), AnnouncerError> {
        if self.watches.contains_key(parent) {
            return Ok(());
        }
        self.watches
            .entry(parent.to_owned())
            .or_try_insert_with(|| {
                // The parent's leaves join the store only once the watch is live.
                let leaves = self.store.leaves_or_detached(parent);
                let watch =
                    ParentWatch::open(parent, Arc::clone(&leaves), Arc::clone(&self.client))?;
                self.store.attach(parent, leaves);
                Ok::<_, CoordinationError>(watch)
            })
            .map(|_| ())
            .map_err(|source| AnnouncerError::coordination(Operation::Watch, parent, source))
    }

    fn delete_node(&self, path: &str) -> Result<(), AnnouncerError> {
        match self.client.delete(path) {
            Ok(()) => Ok(()),
            Err(error) if error.is_no_node() => {
                info!(
                    target: ANNOUNCER_TARGET,
                    path,
                    "asked to unannounce a node that didn't exist anyway"
                );
                Ok(())
            }
            Err(source) => {
                warn!(
                    target: ANNOUNCER_TARGET,
                    path,
                    error = %source,
                    "failed to delete announced node"
                );
                Err(AnnouncerError::coordination(Operation::Delete, path, source))
            }
        }
    }

    fn read_lifecycle(&self) -> Result<RwLockReadGuard<'_, Lifecycle>, AnnouncerError> {
        self.lifecycle
            .read()
            .map_err(|_| AnnouncerError::LifecyclePoisoned)
    }

    fn write_lifecycle(&self) -> Result<RwLockWriteGuard<'_, Lifecycle>, AnnouncerError> {
        self.lifecycle
            .write()
            .map_err(|_| AnnouncerError::LifecyclePoisoned)
    }
}

/// Splits an announceable path: absolute, with no empty segment.
///
/// Only such paths survive being rebuilt from parent and leaf unchanged, which
/// `stop` and reconnect recovery rely on.
fn split_leaf(path: &str) -> Result<PathAndNode, AnnouncerError> {
    let canonical = path
        .strip_prefix(SEPARATOR)
        .is_some_and(|relative| !relative.split(SEPARATOR).any(str::is_empty));
    if !canonical {
        return Err(AnnouncerError::InvalidPath {
            path: path.to_owned(),
        });
    }
    Ok(split_path(path))
}
