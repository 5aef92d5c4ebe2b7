use std::thread;
use crossbeam::channel::{self, Receiver, Sender};
use crate::Result;
use super::ThreadPool;
use tracing::{debug, error, instrument};

/// a unit of work sent to the pool's worker threads
type Job = Box<dyn FnOnce() + Send + 'static>;

/// A thread pool implemented with a shared job queue (i.e. channel).
///
/// Jobs are sent into a crossbeam MPMC [`channel`] and every worker thread pulls from the
/// receiving end. A worker whose job panics is replaced by a fresh thread, so the pool keeps its
/// size. Workers exit once the pool (the sending side) is dropped.
///
/// [`channel`]: https://docs.rs/crossbeam/0.8.1/crossbeam/channel/index.html
pub struct SharedQueueThreadPool {
    /// the sending part of the job queue
    tx: Sender<Job>,
}

impl ThreadPool for SharedQueueThreadPool {

    /// create a new pool with the given number of worker `threads`, each holding a handle to
    /// the receiving end of the job queue
    fn new(threads: u32) -> Result<Self> {
        let (tx, rx) = channel::unbounded::<Job>();
        for id in 0..threads {
            spawn_worker(JobReceiver { id, rx: rx.clone() })?;
        }
        debug!("created shared queue pool with {} threads", threads);
        Ok(SharedQueueThreadPool { tx })
    }

    /// Queues `job` to run on the first idle worker.
    fn spawn<F>(&self, job: F)
        where
            F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            error!("job dropped, the pool has no worker threads left");
        }
    }
}

/// The receiving end of the job queue owned by one worker thread.
/// When the worker unwinds from a panicking job, dropping this value starts its replacement.
#[derive(Clone, Debug)]
struct JobReceiver {
    id: u32,
    rx: Receiver<Job>,
}

impl Drop for JobReceiver {
    fn drop(&mut self) {
        if thread::panicking() {
            debug!("worker {} panicked, starting a new thread", self.id);
            if let Err(e) = spawn_worker(self.clone()) {
                error!("Failed to spawn a thread: {}", e);
            }
        }
    }
}

fn spawn_worker(jobs: JobReceiver) -> Result<()> {
    thread::Builder::new()
        .name(format!("snapkv-worker-{}", jobs.id))
        .spawn(move || run_jobs(jobs))?;
    Ok(())
}

/// waits for jobs to arrive on the queue and runs them, until the queue is disconnected
#[instrument]
fn run_jobs(jobs: JobReceiver) {
    while let Ok(job) = jobs.rx.recv() {
        job();
    }
    debug!("worker {} exited because the thread pool was dropped", jobs.id);
}
