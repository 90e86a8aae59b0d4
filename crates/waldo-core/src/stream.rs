// ── Snapshots and subscriptions ──
//
// The read side of the session store: versioned, key-ordered snapshots
// of one registry, and subscriptions that yield a fresh snapshot per
// mutation.

use std::pin::Pin;
use std::slice;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::Keyed;

// ── Snapshot ─────────────────────────────────────────────────────────

/// A versioned point-in-time view of one registry.
///
/// Entries are ordered by key, so equal versions mean equal contents.
/// Version 0 is the empty registry; every mutation bumps it by one, so
/// comparing versions across reads tells a consumer whether anything
/// happened in between.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    version: u64,
    entries: Arc<Vec<Arc<T>>>,
}

impl<T> Snapshot<T> {
    pub(crate) fn initial() -> Self {
        Self {
            version: 0,
            entries: Arc::new(Vec::new()),
        }
    }

    /// Build the snapshot superseding this one. `entries` must already
    /// be sorted by key.
    pub(crate) fn successor(&self, entries: Vec<Arc<T>>) -> Self {
        Self {
            version: self.version + 1,
            entries: Arc::new(entries),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[Arc<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Arc<T>> {
        self.entries.iter()
    }
}

impl<T: Keyed> Snapshot<T> {
    /// Look up one entry by its registry key.
    pub fn get(&self, key: &str) -> Option<&Arc<T>> {
        self.entries
            .binary_search_by(|e| e.key().as_str().cmp(key))
            .ok()
            .and_then(|i| self.entries.get(i))
    }
}

impl<'a, T> IntoIterator for &'a Snapshot<T> {
    type Item = &'a Arc<T>;
    type IntoIter = slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// A live subscription to one registry.
///
/// Backed by a `watch` channel, so only the latest snapshot is
/// retained: a slow consumer skips intermediate states instead of
/// falling behind.
pub struct Subscription<T: Clone + Send + Sync + 'static> {
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        Self { receiver }
    }

    /// The snapshot as of now, marked as seen.
    pub fn current(&mut self) -> Snapshot<T> {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next mutation, returning the snapshot it produced.
    /// `None` once the owning store is gone.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the registry reaches at least `version`. Lets a
    /// caller read its own writes through the subscription.
    pub async fn reached(&mut self, version: u64) -> Option<Snapshot<T>> {
        let snap = self
            .receiver
            .wait_for(|s| s.version >= version)
            .await
            .ok()?;
        Some(snap.clone())
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> SnapshotStream<T> {
        SnapshotStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over a subscription; yields one snapshot per
/// observed mutation.
pub struct SnapshotStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Clone + Send + Sync + 'static> Stream for SnapshotStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream is Unpin; a snapshot is just a pair of Arcs.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
