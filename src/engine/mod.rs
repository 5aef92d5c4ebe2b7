//! This module provides the key/value storage engine.
//! The engine keeps every key/value pair in memory, behind a single reader/writer lock. Durability
//! is provided separately by the [`snapshot`] and [`backup`] modules, which persist point-in-time
//! copies of the engine's state to a JSON file.
//!
//! [`snapshot`]: ../snapshot/index.html
//! [`backup`]: ../backup/index.html
use std::collections::HashMap;

use crate::Result;

/// The full mapping of keys to values at an instant. It is the unit of snapshotting and backup.
pub type StoreState = HashMap<String, String>;

/// A trait for the basic functionality of a key/value storage engine
pub trait KvsEngine: Clone + Send + 'static {
    /// Gets the value associated with the given `key`
    ///
    /// # Errors
    ///
    /// Returns `KvsError::KeyNotFound` if the given `key` does not exist.
    fn get(&self, key: &str) -> Result<String>;

    /// Returns a copy of every key/value pair currently in the store.
    ///
    /// The returned map is owned by the caller; later writes to the store are not visible in it.
    fn list(&self) -> StoreState;

    /// Removes the given `key` from the store and returns the value it was mapped to
    ///
    /// # Errors
    ///
    /// Returns `KvsError::KeyNotFound` if the given `key` is not found. The store is unchanged.
    fn delete(&self, key: &str) -> Result<String>;

    /// inserts or overwrites every key/value pair in `items`.
    ///
    /// The whole batch is applied at once, readers see either none or all of `items`.
    fn upsert(&self, items: StoreState);

    /// Returns a point-in-time copy of the store, for handing to the persistence layer
    fn snapshot(&self) -> StoreState;
}

mod kvs;

pub use self::kvs::KvStore;
