use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use clap::crate_version;
use tracing::{debug, info, instrument};

use super::{KvsEngine, StoreState};
use crate::error::{KvsError, Result};
use crate::snapshot;

/// The primary struct for working with a [`KvStore`].
///
/// All key/value pairs live in a `HashMap` guarded by a single `RwLock`: `get`, `list` and
/// `snapshot` take the shared side of the lock, `delete` and `upsert` take the exclusive side.
/// No file or network IO is ever performed while the lock is held, callers that need to persist
/// the data take a [`snapshot`](KvsEngine::snapshot) and write that copy instead.
///
/// A `KvStore` is a handle: cloning it is cheap and all clones operate on the same data.
#[derive(Debug, Clone, Default)]
pub struct KvStore {
    // the live key/value mapping
    state: Arc<RwLock<StoreState>>,
}

impl KvStore {
    /// creates an empty `KvStore`
    pub fn new() -> KvStore {
        KvStore::default()
    }

    /// creates a `KvStore` that starts out holding `state`
    pub fn with_state(state: StoreState) -> KvStore {
        KvStore {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// creates a [`KvStore`] using the data in the snapshot file at `path`.
    ///
    /// If the file is missing (or cannot be read) and `allow_empty_on_missing` is `true`, the
    /// store starts out empty.
    ///
    /// # Errors
    /// returns `KvsError::Startup` if the file could not be read and an empty store is not
    /// allowed, or `KvsError::Parse` if the file exists but is not a valid snapshot
    #[instrument]
    pub fn open(path: &Path, allow_empty_on_missing: bool) -> Result<KvStore> {
        info!("opening KVS engine version {}", crate_version!());
        let state = snapshot::load(path, allow_empty_on_missing)?;
        debug!(entries = state.len(), "initial state loaded");
        Ok(KvStore::with_state(state))
    }

    /// returns the number of keys currently in the store
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// returns `true` if the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Every mutation of the map is a complete insert or remove, so a panic on another thread
    // cannot leave it half updated and a poisoned lock is safe to keep using.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KvsEngine for KvStore {
    /// attempts to retrieve the value associated with `key`.
    ///
    /// # Errors
    /// returns `KvsError::KeyNotFound` if the key is not in the store
    fn get(&self, key: &str) -> Result<String> {
        self.read().get(key).cloned().ok_or(KvsError::KeyNotFound)
    }

    fn list(&self) -> StoreState {
        self.read().clone()
    }

    /// removes the specified `key` and returns its value
    ///
    /// # Errors
    /// returns `KvsError::KeyNotFound` if the given `key` was not in the KvStore
    fn delete(&self, key: &str) -> Result<String> {
        self.write().remove(key).ok_or(KvsError::KeyNotFound)
    }

    fn upsert(&self, items: StoreState) {
        let mut state = self.write();
        state.reserve(items.len());
        state.extend(items);
    }

    fn snapshot(&self) -> StoreState {
        // the guard is dropped at the end of this statement, before the caller does any IO
        let copy = self.read().clone();
        debug!(entries = copy.len(), "snapshot taken");
        copy
    }
}
