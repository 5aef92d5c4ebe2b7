//! Periodic persistence of a live store to its snapshot file.
//!
//! A [`BackupScheduler`] runs on its own thread. On every tick of its timer it takes a fresh
//! [`snapshot`](crate::KvsEngine::snapshot) of the engine, encodes it and atomically replaces
//! the snapshot file. The engine's lock is only held while the copy is taken, never during the
//! file write.
//!
//! ```text
//! Idle --start--> Running --tick--> Writing --done--> Running
//!                    |                  |
//!                    +---- cancel ------+--> Stopped
//! ```
//!
//! Cancelling does not interrupt a write that is already in progress, but no new cycle begins
//! once the worker has observed the stop signal. A stopped scheduler cannot be restarted, build
//! a new one instead.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Receiver, Sender};
use tracing::{debug, error, info, instrument};

use crate::engine::KvsEngine;
use crate::error::{KvsError, Result};
use crate::snapshot;

/// The states a started scheduler moves through
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    /// the timer is armed and the worker is waiting for the next tick
    Running,
    /// a backup cycle is in progress
    Writing,
    /// the worker has exited, no more snapshots will be written
    Stopped,
}

impl SchedulerState {
    fn from_u8(value: u8) -> SchedulerState {
        match value {
            0 => SchedulerState::Running,
            1 => SchedulerState::Writing,
            _ => SchedulerState::Stopped,
        }
    }
}

/// An idle backup scheduler. Call [`start`](BackupScheduler::start) to begin writing snapshots.
#[derive(Debug)]
pub struct BackupScheduler<E: KvsEngine> {
    engine: E,
    path: PathBuf,
    interval: Duration,
}

impl<E: KvsEngine> BackupScheduler<E> {
    /// creates a scheduler that will write `engine`'s state to `path` every `interval`
    pub fn new(engine: E, path: impl Into<PathBuf>, interval: Duration) -> Self {
        BackupScheduler {
            engine,
            path: path.into(),
            interval,
        }
    }

    /// spawns the backup thread and returns the handle used to stop it.
    ///
    /// # Errors
    /// returns `KvsError::Parsing` if the interval is zero, or `KvsError::Io` if the thread could
    /// not be spawned
    pub fn start(self) -> Result<CancelHandle> {
        if self.interval.is_zero() {
            return Err(KvsError::Parsing(
                "backup interval must be greater than zero".to_string(),
            ));
        }

        let (stop_tx, stop_rx) = channel::bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let state = Arc::new(AtomicU8::new(SchedulerState::Running as u8));

        let worker = Worker {
            cancelled: Arc::clone(&cancelled),
            state: Arc::clone(&state),
            stop_rx,
        };
        info!(
            "backing up to {:?} every {}ms",
            &self.path,
            self.interval.as_millis()
        );
        let handle = thread::Builder::new()
            .name("snapshot-backup".into())
            .spawn(move || worker.run(self))?;

        Ok(CancelHandle {
            stop_tx,
            cancelled,
            state,
            worker: Some(handle),
        })
    }
}

/// Stops a running [`BackupScheduler`]. Dropping the handle also stops the scheduler.
#[derive(Debug)]
pub struct CancelHandle {
    stop_tx: Sender<()>,
    cancelled: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    worker: Option<JoinHandle<()>>,
}

impl CancelHandle {
    /// signals the scheduler to stop. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("cancelling backup scheduler");
            // the channel has room for exactly this one message
            let _ = self.stop_tx.try_send(());
        }
    }

    /// returns `true` once [`cancel`](CancelHandle::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// returns the current state of the scheduler's worker thread
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// cancels the scheduler and blocks until its thread has exited.
    /// A cycle that was writing when this was called is allowed to finish first.
    ///
    /// # Errors
    /// returns `KvsError::StringErr` if the backup thread panicked
    pub fn join(mut self) -> Result<()> {
        self.cancel();
        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| KvsError::StringErr("backup thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The state shared between a [`CancelHandle`] and its backup thread
struct Worker {
    cancelled: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    stop_rx: Receiver<()>,
}

impl Worker {
    fn run<E: KvsEngine>(self, scheduler: BackupScheduler<E>) {
        let ticker = channel::tick(scheduler.interval);
        loop {
            select! {
                recv(self.stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    if self.cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    self.set_state(SchedulerState::Writing);
                    match backup_cycle(&scheduler.engine, &scheduler.path) {
                        Ok(entries) => debug!("backed up {} keys", entries),
                        // the previous snapshot is untouched, try again on the next tick
                        Err(e) => error!("backup to {:?} failed: {}", &scheduler.path, e),
                    }
                    self.set_state(SchedulerState::Running);
                }
            }
        }
        self.set_state(SchedulerState::Stopped);
        info!("backup scheduler stopped");
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// runs a single backup cycle: takes a fresh snapshot of `engine` and atomically writes it to
/// `path`. Returns the number of keys written.
#[instrument(skip(engine))]
pub fn backup_cycle<E: KvsEngine>(engine: &E, path: &Path) -> Result<usize> {
    let state = engine.snapshot();
    snapshot::write_atomic(path, &state)?;
    Ok(state.len())
}
