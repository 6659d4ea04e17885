use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashSet;
use parking_lot::RwLock;

use crate::attribute::ObjectValue;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Interns equal object values so they share one allocation.
#[derive(Default)]
pub struct ObjectCache {
    inner: RwLock<AHashSet<ObjectValue>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AHashSet::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached instance equal to `value`, inserting it if absent.
    pub fn intern(&self, value: ObjectValue) -> ObjectValue {
        if let Some(existing) = self.inner.read().get(&value).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return existing;
        }
        let mut inner = self.inner.write();
        if let Some(existing) = inner.get(&value).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return existing;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        inner.insert(value.clone());
        value
    }

    pub fn clear(&self) {
        self.inner.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.inner.read().len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}
