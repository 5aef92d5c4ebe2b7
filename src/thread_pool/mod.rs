//! Thread pools used by the [`KvsServer`] to service client connections.
//!
//! [`KvsServer`]: ../struct.KvsServer.html
use crate::Result;

/// A pool of threads that jobs can be spawned onto
pub trait ThreadPool {
    /// creates a new thread pool, immediately spawning the given number of `threads`
    ///
    /// # Errors
    /// returns an error if any thread fails to spawn
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// spawns a function into the thread pool.
    ///
    /// Spawning always succeeds, but if the function panics the thread pool continues to
    /// operate with the same number of threads
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

mod rayon_pool;
mod shared_queue;

pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;
