//! Record of everything the announcer must keep present.
//!
//! Announcements are grouped by parent path. Each parent owns a concurrent
//! leaf map shared with that parent's watch, so event handlers read the same
//! map that `announce` and `unannounce` mutate without going through the
//! store.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Payload bytes, shared between the store and recreation requests.
pub(crate) type Payload = Arc<[u8]>;

/// Leaf name to payload for a single parent.
pub(crate) type LeafMap = DashMap<String, Payload>;

#[derive(Debug, Default)]
pub(crate) struct AnnouncementStore {
    parents: DashMap<String, Arc<LeafMap>>,
}

impl AnnouncementStore {
    /// Leaf map for `parent`, or a fresh one that is not yet in the store.
    ///
    /// A fresh map is only recorded once handed to [`Self::attach`].
    pub(crate) fn leaves_or_detached(&self, parent: &str) -> Arc<LeafMap> {
        self.parents
            .get(parent)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_default()
    }

    /// Records `leaves` as the map for `parent` unless one is already present.
    pub(crate) fn attach(&self, parent: &str, leaves: Arc<LeafMap>) {
        self.parents.entry(parent.to_owned()).or_insert(leaves);
    }

    /// Returns the leaf map for `parent`, creating an empty one if needed.
    pub(crate) fn leaves(&self, parent: &str) -> Arc<LeafMap> {
        if let Some(existing) = self.parents.get(parent) {
            return Arc::clone(existing.value());
        }
        let entry = self.parents.entry(parent.to_owned()).or_default();
        Arc::clone(entry.value())
    }

    /// Inserts the payload unless the leaf is already present.
    ///
    /// Returns `false`, leaving the existing payload untouched, when the leaf
    /// was already announced.
    pub(crate) fn insert(&self, parent: &str, leaf: &str, payload: Payload) -> bool {
        let leaves = self.leaves(parent);
        match leaves.entry(leaf.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(payload);
                true
            }
        }
    }

    /// Removes a leaf, returning its payload if it was present.
    pub(crate) fn remove(&self, parent: &str, leaf: &str) -> Option<Payload> {
        let leaves = self
            .parents
            .get(parent)
            .map(|entry| Arc::clone(entry.value()))?;
        leaves.remove(leaf).map(|(_, payload)| payload)
    }

    pub(crate) fn payload(&self, parent: &str, leaf: &str) -> Option<Payload> {
        let leaves = self
            .parents
            .get(parent)
            .map(|entry| Arc::clone(entry.value()))?;
        leaves.get(leaf).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn contains(&self, parent: &str, leaf: &str) -> bool {
        self.payload(parent, leaf).is_some()
    }

    /// Empties the store, returning every parent with the leaves it held.
    ///
    /// Parent entries are removed as well so that a later announcement under
    /// the same parent starts from a fresh leaf map.
    pub(crate) fn drain(&self) -> Vec<(String, Vec<String>)> {
        let parents: Vec<String> = self
            .parents
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        let mut drained = Vec::with_capacity(parents.len());
        for key in parents {
            let Some((parent, leaves)) = self.parents.remove(&key) else {
                continue;
            };
            let names: Vec<String> = leaves.iter().map(|entry| entry.key().clone()).collect();
            leaves.clear();
            drained.push((parent, names));
        }
        drained
    }

    /// Number of parents holding a leaf map.
    pub(crate) fn parent_count(&self) -> usize {
        self.parents.len()
    }

    /// Total number of announced leaves across all parents.
    pub(crate) fn len(&self) -> usize {
        self.parents.iter().map(|entry| entry.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn payload(bytes: &[u8]) -> Payload {
        Arc::from(bytes)
    }

    #[fixture]
    fn store() -> AnnouncementStore {
        AnnouncementStore::default()
    }

    #[rstest]
    fn duplicate_insert_keeps_original_payload(store: AnnouncementStore) {
        assert!(store.insert("/live", "a", payload(b"first")));
        assert!(!store.insert("/live", "a", payload(b"second")));

        let stored = store.payload("/live", "a").expect("payload present");
        assert_eq!(&*stored, b"first");
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    fn leaf_map_is_shared_with_watchers(store: AnnouncementStore) {
        let leaves = store.leaves("/live");
        assert!(store.insert("/live", "a", payload(b"x")));

        assert!(leaves.contains_key("a"));
        assert!(Arc::ptr_eq(&leaves, &store.leaves("/live")));
    }

    #[rstest]
    fn detached_map_is_recorded_only_when_attached(store: AnnouncementStore) {
        let detached = store.leaves_or_detached("/live");
        assert_eq!(store.parent_count(), 0);

        store.attach("/live", Arc::clone(&detached));
        assert!(store.insert("/live", "a", payload(b"x")));

        assert_eq!(store.parent_count(), 1);
        assert!(detached.contains_key("a"));
        assert!(Arc::ptr_eq(&detached, &store.leaves_or_detached("/live")));
    }

    #[rstest]
    fn remove_reports_absence(store: AnnouncementStore) {
        assert!(store.remove("/missing", "a").is_none());
        assert!(store.insert("/live", "a", payload(b"x")));
        assert!(store.remove("/live", "b").is_none());
        assert_eq!(
            store.remove("/live", "a").as_deref(),
            Some(b"x".as_slice())
        );
        assert!(!store.contains("/live", "a"));
    }

    #[rstest]
    fn drain_empties_every_parent(store: AnnouncementStore) {
        let leaves = store.leaves("/one");
        assert!(store.insert("/one", "a", payload(b"1")));
        assert!(store.insert("/one", "b", payload(b"2")));
        assert!(store.insert("/two", "c", payload(b"3")));

        let mut drained = store.drain();
        drained.sort();
        for (_, names) in &mut drained {
            names.sort();
        }

        assert_eq!(
            drained,
            vec![
                (String::from("/one"), vec![String::from("a"), String::from("b")]),
                (String::from("/two"), vec![String::from("c")]),
            ]
        );
        assert_eq!(store.len(), 0);
        assert!(leaves.is_empty());
        assert!(!Arc::ptr_eq(&leaves, &store.leaves("/one")));
    }
}
