// ── Generic reactive entity registry ──
//
// Lock-free concurrent storage with O(1) lookups and push-based
// change notification via a `watch` channel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::stream::Snapshot;

/// Entities that know their own registry key.
pub trait Keyed {
    fn key(&self) -> String;
}

/// A reactive keyed collection for a single entity type.
///
/// Uses a `DashMap` for concurrent lookups. Every mutation rebuilds
/// the key-ordered [`Snapshot`] broadcast to subscribers, bumping its
/// version by one.
pub(crate) struct Registry<T: Clone + Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Keyed + Clone + Send + Sync + 'static> Registry<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Snapshot::initial());

        Self {
            by_key: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace an entity. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, entity: T) -> bool {
        let key = entity.key();
        let is_new = !self.by_key.contains_key(&key);
        self.by_key.insert(key, Arc::new(entity));

        self.rebuild_snapshot();
        is_new
    }

    /// Mutate an entity in place. Returns the updated entity, or `None`
    /// if the key is absent.
    pub(crate) fn update(&self, key: &str, f: impl FnOnce(&mut T)) -> Option<Arc<T>> {
        let updated = {
            let mut entry = self.by_key.get_mut(key)?;
            let mut value = (**entry.value()).clone();
            f(&mut value);
            let value = Arc::new(value);
            *entry.value_mut() = Arc::clone(&value);
            value
        };

        self.rebuild_snapshot();
        Some(updated)
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Get the current snapshot (cheap clone of two `Arc`s).
    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    /// Remove all entities.
    pub(crate) fn clear(&self) {
        self.by_key.clear();
        self.rebuild_snapshot();
    }

    /// Return all current keys in the collection.
    pub(crate) fn keys(&self) -> Vec<String> {
        self.by_key.iter().map(|r| r.key().clone()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Rebuild the key-ordered snapshot and broadcast it.
    fn rebuild_snapshot(&self) {
        let mut pairs: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let entries: Vec<Arc<T>> = pairs.into_iter().map(|(_, v)| v).collect();

        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot
            .send_modify(|snap| *snap = snap.successor(entries));
    }
}
