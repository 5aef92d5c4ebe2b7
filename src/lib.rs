#![warn(missing_docs)]
//! An in-memory, multithreaded key-value store (snapkv) that maps [`String`] keys to [`String`]
//! values, and periodically snapshots its contents to a JSON file for crash recovery.
//!
//! This crate provides the [`KvStore`] engine itself, the snapshot and backup machinery that
//! makes it durable, as well as a [`snapkv-client`] and [`snapkv-server`] executable that can be
//! used to interact with the engine over the network.
//!
//! ## Supported Storage Operations
//! The engine supports four types of operations (a.k.a "commands"):
//!
//! - `GET` the value associated with a key
//! - `LIST` every key/value pair in the store
//! - `DELETE` a key, returning the value it held
//! - `UPSERT` a batch of key/value pairs, inserting new keys and overwriting existing ones
//!
//! See the [`KvsEngine`] trait and the [`Request`] and [`Response`] types for more information
//! on the structure of these operations.
//!
//! ## KvStore
//! [`KvStore`] is the implementor of the [`KvsEngine`] trait and the brains of this entire
//! operation.
//! It is responsible for the following tasks:
//! - processing the GET, LIST, DELETE and UPSERT operations
//! - keeping the kv data in a `HashMap` behind a single reader/writer lock, so any number of
//! readers can run at once while writers get exclusive access
//! - applying an UPSERT batch as one critical section, no reader ever sees half a batch
//! - handing out independent copies of its data (`list` and `snapshot`), so no caller can
//! observe or cause a mutation of the live map
//!
//! ## Snapshots and Backups
//! The store's only durable form is a single "snapshot" file: one JSON object mapping every key
//! to its value, e.g. `{"a":"1","b":"2"}` (see the [`snapshot`] module).
//!
//! - At start-up the snapshot is loaded with [`KvStore::open`]. A missing file yields an empty
//! store when that is allowed, a corrupted file always aborts the start-up.
//! - While running, a [`BackupScheduler`] copies the store on a fixed interval and replaces the
//! snapshot file with the copy. The new file is written next to the old one and renamed into
//! place, so a crash mid-write never loses the previous snapshot.
//!
//! ## Client / Server
//! Client and server logic is contained in the [`KvsClient`] and [`KvsServer`] structs. They are
//! responsible for the networking portion of this application, but also handle the
//! serialization of data to/from the custom protocol: a [`Request`] encoded as a JSON value and
//! sent over a `TcpStream`, answered by a JSON [`Response`]. A missing key is answered with
//! its own [`Response::NotFound`] variant, separate from other errors.
//!
//! ### Client / Server executables
//! The [`snapkv-server`] executable loads the snapshot, starts the backup scheduler and serves
//! connections on a thread pool. The [`snapkv-client`] executable sends a single request.
//!
//! [`String`]: https://doc.rust-lang.org/std/string/struct.String.html
//! [`snapkv-server`]: ../snapkv_server/index.html
//! [`snapkv-client`]: ../snapkv_client/index.html

pub use backup::{backup_cycle, BackupScheduler, CancelHandle, SchedulerState};
pub use client::KvsClient;
pub use command::{parse_pairs, Request, Response};
pub use config::{PoolKind, ServerConfig};
pub use engine::{KvStore, KvsEngine, StoreState};
pub use error::{KvsError, Result};
pub use server::KvsServer;
pub use thread_pool::{RayonThreadPool, SharedQueueThreadPool, ThreadPool};

pub mod backup;
mod client;
mod command;
pub mod config;
mod engine;
mod error;
mod server;
pub mod snapshot;
pub mod thread_pool;
