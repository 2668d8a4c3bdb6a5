// ── Generic record collection ──
//
// Concurrent storage keyed by record id. Reads clone records out of the
// map so no shard guard outlives the call.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

/// Concurrent map of records.
pub(crate) struct Collection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    by_id: DashMap<K, Arc<T>>,
}

impl<K, T> Collection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    /// Insert or replace a record. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, id: K, record: T) -> bool {
        self.by_id.insert(id, Arc::new(record)).is_none()
    }

    /// Remove a record by id. Returns it if it existed.
    pub(crate) fn remove(&self, id: &K) -> Option<Arc<T>> {
        self.by_id.remove(id).map(|(_, v)| v)
    }

    pub(crate) fn get(&self, id: &K) -> Option<Arc<T>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Records matching a predicate, cloned out of the map.
    pub(crate) fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.by_id
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| T::clone(r.value()))
            .collect()
    }

    /// First record matching a predicate.
    pub(crate) fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.by_id
            .iter()
            .find(|r| pred(r.value()))
            .map(|r| T::clone(r.value()))
    }

    /// Every record, cloned out of the map.
    pub(crate) fn all(&self) -> Vec<T> {
        self.filter(|_| true)
    }
}
