//! In-memory snapshot cache
//!
//! Holds the last computed value as an immutable `Arc` snapshot. Readers
//! clone the `Arc` under a short read lock; a miss triggers a fill that runs
//! outside that lock and only takes the write lock to swap the result in.
//! Fills are single-flight: callers that miss while a fill is running wait
//! for it and share its result instead of recomputing.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cache of a single computed value with explicit invalidation
pub struct SnapshotCache<T> {
    slot: RwLock<Option<Arc<T>>>,
    fill_lock: Mutex<()>,
    /// Bumped on every invalidation
    generation: AtomicU64,
    /// Completed fills
    fills: AtomicUsize,
}

impl<T> SnapshotCache<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            fill_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            fills: AtomicUsize::new(0),
        }
    }

    /// Current snapshot, if any
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.read().clone()
    }

    pub fn is_cached(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Return the snapshot, computing it with `fill` on a miss.
    ///
    /// Errors are returned to the caller and nothing is cached. A value whose
    /// fill overlapped an [`invalidate`](Self::invalidate) is returned but
    /// not stored.
    pub async fn get_or_try_fill<F, Fut, E>(&self, fill: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(snapshot) = self.get() {
            return Ok(snapshot);
        }

        let _guard = self.fill_lock.lock().await;

        // Filled while we were waiting
        if let Some(snapshot) = self.get() {
            return Ok(snapshot);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let value = Arc::new(fill().await?);
        self.fills.fetch_add(1, Ordering::Relaxed);

        let mut slot = self.slot.write();
        if self.generation.load(Ordering::Acquire) == generation {
            *slot = Some(Arc::clone(&value));
        } else {
            tracing::debug!("Cache invalidated during fill, result not stored");
        }

        Ok(value)
    }

    /// Drop the snapshot; the next read recomputes
    pub fn invalidate(&self) {
        let mut slot = self.slot.write();
        *slot = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of completed fills since creation
    pub fn fill_count(&self) -> usize {
        self.fills.load(Ordering::Relaxed)
    }
}

impl<T> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
