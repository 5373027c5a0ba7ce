//! Worker pool and the tasks that drive it.
//!
//! ## Structure
//!
//! - [`manager`] - [`WorkerPool`], the entry point that wires queues, workers,
//!   feeder and supervisor together.
//! - `worker` - the async worker loop.
//! - `coordinator` - the job feeder and the supervisor that closes the result
//!   sink once the completion barrier is released.
//! - `processor` - what a worker does with a single job.
//! - `stream` - [`ResultStream`], the consumer side of an async dispatch.
//! - [`threaded`] - the same pool on OS threads.

mod coordinator;
pub mod manager;
mod processor;
mod stream;
pub mod threaded;
mod worker;

#[cfg(test)]
mod tests;

pub use manager::WorkerPool;
pub use stream::ResultStream;
pub use threaded::{BlockingResults, dispatch_blocking};

use crate::{Doubler, PoolConfig, Result, Transform, TransformError};

/// What a worker pushes to the result sink for each job.
pub type Outcome<T> = core::result::Result<
    <T as Transform>::Output,
    TransformError<<T as Transform>::Input, <T as Transform>::Error>,
>;

/// Doubles every job across `worker_count` workers.
///
/// Uses the default per-job delay. Must be called from within a tokio
/// runtime.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidConfig`] if `worker_count` is zero.
pub fn dispatch(
    jobs: impl IntoIterator<Item = i64>,
    worker_count: usize,
) -> Result<ResultStream<Doubler>> {
    let pool = WorkerPool::new(PoolConfig::with_workers(worker_count), Doubler)?;
    Ok(pool.dispatch(jobs))
}
