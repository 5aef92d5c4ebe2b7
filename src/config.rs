//! Startup configuration of the `snapkv-server` executable.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::arg_enum;
use tracing::Level;

use crate::{KvsError, Result};

/// the address the server listens on when `--addr` is not given
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5555";
/// the snapshot file used when `--file` is not given
pub const DEFAULT_SNAPSHOT_FILE: &str = "./db.json";
/// milliseconds between two backup cycles
pub const DEFAULT_BACKUP_INTERVAL_MS: &str = "1000";
/// number of threads in the connection pool
pub const DEFAULT_THREADS: &str = "4";

arg_enum! {
    /// The thread pool implementations a server can service connections with
    #[allow(non_camel_case_types)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum PoolKind {
        shared,
        rayon
    }
}

/// [`ServerConfig`] holds parsed and validated options for running a server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// the IP:PORT to listen on
    pub addr: SocketAddr,
    /// where snapshots are loaded from at startup and backed up to
    pub snapshot_path: PathBuf,
    /// time between two backup cycles
    pub backup_interval: Duration,
    /// start with an empty store when the snapshot file is missing
    pub allow_empty: bool,
    /// the connection thread pool implementation
    pub pool: PoolKind,
    /// number of threads in the connection pool
    pub threads: u32,
    /// maximum level of the log events written to stderr
    pub log_level: Level,
}

impl ServerConfig {
    /// validates the raw command line values and builds a `ServerConfig` from them
    ///
    /// # Errors
    /// returns [`KvsError::Parsing`] if one of the values is invalid
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        addr: &str,
        snapshot_path: &str,
        backup_interval_ms: &str,
        allow_empty: &str,
        pool: &str,
        threads: &str,
        log_level: &str,
    ) -> Result<ServerConfig> {
        let addr: SocketAddr = addr.parse().map_err(|_| {
            KvsError::Parsing(format!("could not parse {} into an IP address and port", addr))
        })?;

        if snapshot_path.is_empty() {
            return Err(KvsError::Parsing("the snapshot file path is empty".to_string()));
        }

        let interval_ms: u64 = backup_interval_ms.parse().map_err(|_| {
            KvsError::Parsing(format!(
                "backup interval must be a number of milliseconds, got: {}",
                backup_interval_ms
            ))
        })?;
        if interval_ms == 0 {
            return Err(KvsError::Parsing(
                "backup interval must be greater than zero".to_string(),
            ));
        }

        let allow_empty: bool = allow_empty.parse().map_err(|_| {
            KvsError::Parsing(format!("expected true or false, got: {}", allow_empty))
        })?;

        let pool: PoolKind = pool
            .parse()
            .map_err(|e| KvsError::Parsing(format!("unknown thread pool: {}", e)))?;

        let threads: u32 = match threads.parse() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(KvsError::Parsing(format!(
                    "thread count must be a positive integer, got: {}",
                    threads
                )))
            }
        };

        let log_level: Level = log_level
            .parse()
            .map_err(|_| KvsError::Parsing(format!("unknown log level: {}", log_level)))?;

        Ok(ServerConfig {
            addr,
            snapshot_path: PathBuf::from(snapshot_path),
            backup_interval: Duration::from_millis(interval_ms),
            allow_empty,
            pool,
            threads,
            log_level,
        })
    }
}
