//! Snapshot-replacement storage for collections read by many and written
//! by one.

use std::sync::{Arc, PoisonError, RwLock};

use surfaced_report_models::UrbanReport;

/// Holds the current collection as an immutable, shared snapshot.
///
/// Writers swap in a whole new collection; readers clone the [`Arc`] and
/// keep a consistent view for as long as they hold it. Nothing is ever
/// mutated in place.
#[derive(Debug)]
pub struct SnapshotStore<T> {
    current: RwLock<Arc<Vec<T>>>,
}

/// The active report collection.
pub type ReportStore = SnapshotStore<UrbanReport>;

impl<T> SnapshotStore<T> {
    /// Creates a store holding `initial`.
    #[must_use]
    pub fn new(initial: Vec<T>) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the whole collection, returning the previous snapshot.
    pub fn replace(&self, next: Vec<T>) -> Arc<Vec<T>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, Arc::new(next))
    }

    /// Number of items in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the current snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl<T: Clone> SnapshotStore<T> {
    /// Builds the next snapshot from a copy of the current one. The write
    /// lock is held throughout, so concurrent updates are never lost.
    pub fn update(&self, f: impl FnOnce(&mut Vec<T>)) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = current.as_ref().clone();
        f(&mut next);
        *current = Arc::new(next);
    }
}

impl<T> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self::new(vec![])
    }
}
