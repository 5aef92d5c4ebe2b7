use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// type alias for all operations on a [`KvStore`] that could fail with a [`KvsError`]
///
/// [`KvStore`]: ./struct.KvStore.html
pub type Result<T> = std::result::Result<T, KvsError>;

/// The Error variants used throughout the store, the snapshot layer and the client/server.
#[derive(Debug, Error)]
pub enum KvsError {
    /// a `get` or `delete` was made for a key that is not in the store
    #[error("Key not found")]
    KeyNotFound,

    /// the contents of a snapshot file could not be decoded into a key/value mapping
    #[error("malformed snapshot: {0}")]
    Parse(#[source] serde_json::Error),

    /// the snapshot file could not be read and an empty initial state was not allowed
    #[error("could not load snapshot file {path:?}: {source}")]
    Startup {
        /// path of the snapshot file
        path: PathBuf,
        /// the underlying read error
        #[source]
        source: io::Error,
    },

    /// variant for errors caused from file or network IO
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// (de)serialization errors of the client/server protocol
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// invalid configuration or command line values
    #[error("parsing error: {0}")]
    Parsing(String),

    /// an error message relayed from the server
    #[error("{0}")]
    StringErr(String),
}

impl KvsError {
    /// returns `true` if this error signals an absent key, the only "normal" negative result
    /// a caller of the store can receive
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvsError::KeyNotFound)
    }
}
