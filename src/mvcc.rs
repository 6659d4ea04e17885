//! Snapshot/commit controller for a shared graph store.
//!
//! Copy-on-write at write-transaction granularity:
//! - The active store sits behind an `ArcSwap`; readers pin it lock-free
//! - A single writer works on a private copy of the active store
//! - Commit swaps the copy in atomically; the old active becomes standby
//! - The standby's buffers are reused for the next working copy once no
//!   reader still pins it

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::archive;
use crate::config::ArchiveConfig;
use crate::errors::GraphError;
use crate::graph::GraphStore;

/// Writer-side lifecycle of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// No writer holds the gate
    Idle,
    /// A writer owns a private working copy
    Writing,
    /// The working copy is being published
    Committing,
}

/// Result of committing a write handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The working copy became the active store under this sequence number
    Published { sequence: u64 },
    /// Nothing changed; the active store was left in place
    Unchanged,
}

struct Version {
    sequence: u64,
    store: GraphStore,
    readers: AtomicUsize,
}

impl Version {
    fn new(sequence: u64, store: GraphStore) -> Self {
        Self {
            sequence,
            store,
            readers: AtomicUsize::new(0),
        }
    }
}

/// Shares one graph between many readers and one writer at a time.
pub struct SnapshotController {
    active: ArcSwap<Version>,
    standby: Mutex<Option<Arc<Version>>>,
    write_gate: Mutex<()>,
    state: Mutex<ControllerState>,
}

impl SnapshotController {
    pub fn new(store: GraphStore) -> Self {
        Self {
            active: ArcSwap::new(Arc::new(Version::new(0, store))),
            standby: Mutex::new(None),
            write_gate: Mutex::new(()),
            state: Mutex::new(ControllerState::Idle),
        }
    }

    /// Pin the current active store. Never blocks.
    pub fn acquire_read(&self) -> ReadHandle {
        let version = self.active.load_full();
        version.readers.fetch_add(1, Ordering::AcqRel);
        ReadHandle { version }
    }

    /// Give a read handle back. Equivalent to dropping it.
    pub fn release(&self, handle: ReadHandle) {
        drop(handle);
    }

    /// Wait for the write gate and return a handle on a private working copy.
    pub fn acquire_write(&self) -> WriteHandle<'_> {
        let gate = self.write_gate.lock();
        self.begin_write(gate)
    }

    /// Like [`acquire_write`](Self::acquire_write) but fails with `WriteBusy`
    /// instead of waiting.
    pub fn try_acquire_write(&self) -> Result<WriteHandle<'_>, GraphError> {
        match self.write_gate.try_lock() {
            Some(gate) => Ok(self.begin_write(gate)),
            None => {
                warn!("write handle requested while another writer is active");
                Err(GraphError::write_busy("another writer is active"))
            }
        }
    }

    /// Wait at most `timeout` for the write gate.
    pub fn acquire_write_timeout(&self, timeout: Duration) -> Result<WriteHandle<'_>, GraphError> {
        match self.write_gate.try_lock_for(timeout) {
            Some(gate) => Ok(self.begin_write(gate)),
            None => {
                warn!(?timeout, "timed out waiting for write handle");
                Err(GraphError::write_busy(format!(
                    "no write handle within {timeout:?}"
                )))
            }
        }
    }

    /// Run `f` on a working copy; commit on `Ok`, roll back on `Err`.
    pub fn write<F, T>(&self, f: F) -> Result<T, GraphError>
    where
        F: FnOnce(&mut GraphStore) -> Result<T, GraphError>,
    {
        let mut handle = self.acquire_write();
        match f(&mut *handle) {
            Ok(value) => {
                handle.commit();
                Ok(value)
            }
            Err(e) => {
                handle.rollback();
                Err(e)
            }
        }
    }

    /// Load an archive into a fresh store and publish it on success.
    /// The active store is untouched when loading fails.
    pub fn load_archive<P: AsRef<Path>>(
        &self,
        path: P,
        cfg: &ArchiveConfig,
    ) -> Result<CommitOutcome, GraphError> {
        let registry = Arc::clone(self.active.load().store.registry());
        let store = archive::load_from_path(path, cfg, registry)?;
        Ok(self.replace(store))
    }

    /// Publish `store` as the new active store. Waits for the write gate
    /// like [`acquire_write`](Self::acquire_write) but takes no working copy.
    pub fn replace(&self, store: GraphStore) -> CommitOutcome {
        let _gate = self.write_gate.lock();
        let sequence = self.publish(store);
        info!(sequence, "replaced active store");
        CommitOutcome::Published { sequence }
    }

    /// Save the current active store.
    pub fn save_archive<P: AsRef<Path>>(&self, path: P, cfg: &ArchiveConfig) -> Result<(), GraphError> {
        let snapshot = self.acquire_read();
        archive::save_to_path(&snapshot, path, cfg)
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    /// Sequence number of the active store; bumps on every publish.
    pub fn sequence(&self) -> u64 {
        self.active.load().sequence
    }

    /// Read handles currently pinning the active store.
    pub fn active_readers(&self) -> usize {
        self.active.load().readers.load(Ordering::Acquire)
    }

    /// Read handles still pinning the retired store, if any.
    pub fn standby_readers(&self) -> Option<usize> {
        self.standby
            .lock()
            .as_ref()
            .map(|version| version.readers.load(Ordering::Acquire))
    }

    fn begin_write<'a>(&'a self, gate: MutexGuard<'a, ()>) -> WriteHandle<'a> {
        *self.state.lock() = ControllerState::Writing;
        let base = self.active.load_full();
        let store = self.working_copy(&base.store);
        debug!(base = base.sequence, "write handle acquired");
        WriteHandle {
            controller: self,
            _gate: gate,
            base_sequence: base.sequence,
            base_mod_count: base.store.global_mod_count(),
            replaced: false,
            finished: false,
            store,
        }
    }

    fn working_copy(&self, active: &GraphStore) -> GraphStore {
        let spare = self.standby.lock().take();
        if let Some(version) = spare {
            match Arc::try_unwrap(version) {
                Ok(version) => {
                    let mut store = version.store;
                    store.clone_from(active);
                    return store;
                }
                // still pinned by a reader; keep it retired
                Err(version) => *self.standby.lock() = Some(version),
            }
        }
        active.clone()
    }

    fn publish(&self, store: GraphStore) -> u64 {
        *self.state.lock() = ControllerState::Committing;
        let sequence = self.active.load().sequence + 1;
        let previous = self.active.swap(Arc::new(Version::new(sequence, store)));
        *self.standby.lock() = Some(previous);
        *self.state.lock() = ControllerState::Idle;
        sequence
    }

    fn finish_without_publish(&self) {
        *self.state.lock() = ControllerState::Idle;
    }
}

impl fmt::Debug for SnapshotController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotController")
            .field("sequence", &self.sequence())
            .field("state", &self.state())
            .finish()
    }
}

/// Immutable view of the store that was active when the handle was taken.
///
/// Derefs to `&GraphStore`; every mutator needs `&mut`, so none is reachable.
pub struct ReadHandle {
    version: Arc<Version>,
}

impl ReadHandle {
    pub fn sequence(&self) -> u64 {
        self.version.sequence
    }

    pub fn store(&self) -> &GraphStore {
        &self.version.store
    }
}

impl Deref for ReadHandle {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        &self.version.store
    }
}

impl Clone for ReadHandle {
    fn clone(&self) -> Self {
        self.version.readers.fetch_add(1, Ordering::AcqRel);
        Self {
            version: Arc::clone(&self.version),
        }
    }
}

impl Drop for ReadHandle {
    fn drop(&mut self) {
        self.version.readers.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for ReadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("sequence", &self.version.sequence)
            .finish()
    }
}

/// Exclusive handle on a private working copy.
///
/// Dropping the handle without calling [`commit`](Self::commit) rolls back.
#[derive(Debug)]
pub struct WriteHandle<'a> {
    controller: &'a SnapshotController,
    _gate: MutexGuard<'a, ()>,
    base_sequence: u64,
    base_mod_count: u64,
    replaced: bool,
    finished: bool,
    store: GraphStore,
}

impl WriteHandle<'_> {
    /// Sequence number of the store this copy was taken from.
    pub fn base_sequence(&self) -> u64 {
        self.base_sequence
    }

    /// Swap in a whole new store, e.g. one read from an archive.
    pub fn replace_store(&mut self, store: GraphStore) {
        self.store = store;
        self.replaced = true;
    }

    /// Publish the working copy. A copy with no recorded change is dropped
    /// and reported as [`CommitOutcome::Unchanged`].
    pub fn commit(mut self) -> CommitOutcome {
        self.finished = true;
        if !self.replaced && self.store.global_mod_count() == self.base_mod_count {
            self.controller.finish_without_publish();
            debug!(base = self.base_sequence, "commit without changes");
            return CommitOutcome::Unchanged;
        }
        let placeholder = GraphStore::with_registry(Arc::clone(self.store.registry()));
        let store = std::mem::replace(&mut self.store, placeholder);
        let sequence = self.controller.publish(store);
        info!(sequence, base = self.base_sequence, "committed working copy");
        CommitOutcome::Published { sequence }
    }

    /// Discard the working copy.
    pub fn rollback(mut self) {
        self.finished = true;
        self.controller.finish_without_publish();
        debug!(base = self.base_sequence, "rolled back working copy");
    }
}

impl Deref for WriteHandle<'_> {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        &self.store
    }
}

impl DerefMut for WriteHandle<'_> {
    fn deref_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }
}

impl Drop for WriteHandle<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.controller.finish_without_publish();
            warn!(base = self.base_sequence, "write handle dropped without commit; rolled back");
        }
    }
}
