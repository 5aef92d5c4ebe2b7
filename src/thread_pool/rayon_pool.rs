use crate::{KvsError, Result};
use super::ThreadPool;
use tracing::debug;

/// A thread pool that uses the work stealing scheduler of the [`Rayon`] library.
/// Panics inside a job are caught by rayon and do not take down the worker.
///
/// [`Rayon`]: https://docs.rs/rayon/latest/rayon/index.html
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {

    fn new(threads: u32) -> Result<Self> where Self: Sized {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("snapkv-rayon-{}", i))
            .panic_handler(|_| debug!("a job panicked on the rayon pool"))
            .build()
            .map_err(|e|
                KvsError::StringErr(format!("could not build thread pool: {:?}", &e)))?;
        debug!("created rayon pool with {} threads", &threads);

        Ok(Self { pool })
    }

    fn spawn<F>(&self, job: F) where F: FnOnce() + Send + 'static {
        // `spawn` queues the job and returns at once, the server's accept loop never waits on it
        self.pool.spawn(job);
    }
}
