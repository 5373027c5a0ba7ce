//! Thread-backed flavor of the pool.
//!
//! Same contract as [`crate::WorkerPool::dispatch`], but every worker is an OS
//! thread and the queues are `crossbeam-channel` channels, which are
//! multi-consumer out of the box. Useful from synchronous code or when the
//! transform is CPU-heavy enough that it should not run on async executor
//! threads.

use super::{
    coordinator::{feed_jobs_blocking, finalize},
    processor::{announce_job, apply_job_guarded, record_delivery},
};
use crate::{
    CompletionBarrier, Error, Outcome, PoolConfig, PoolReport, Result, Transform, WorkerGuard,
};
use core::time::Duration;
use crossbeam_channel::{Receiver, Sender};
use std::{sync::Arc, thread};
use tokio_util::sync::CancellationToken;

/// Runs `jobs` through `transform` on `config.num_workers` threads.
///
/// # Errors
///
/// - [`Error::InvalidConfig`] if `config` is rejected.
/// - [`Error::Spawn`] if a thread could not be started.
pub fn dispatch_blocking<T: Transform>(
    jobs: impl IntoIterator<Item = T::Input>,
    config: &PoolConfig,
    transform: T,
) -> Result<BlockingResults<T>> {
    config.validate()?;
    spawn_blocking_pool(
        config,
        Arc::new(transform),
        jobs.into_iter().collect(),
        CancellationToken::new(),
    )
}

/// Blocking iterator over the outcomes of one threaded dispatch.
///
/// `next()` blocks until a worker produces an outcome, and returns `None` once
/// the supervisor has closed the result sink.
pub struct BlockingResults<T: Transform> {
    results: Receiver<Outcome<T>>,
    supervisor: thread::JoinHandle<Result<PoolReport>>,
    cancel: CancellationToken,
}

impl<T: Transform> BlockingResults<T> {
    /// Asks every worker to stop after its current job.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Blocks until the pool has shut down. Unconsumed results are discarded.
    ///
    /// # Errors
    ///
    /// Same as [`crate::ResultStream::completion`].
    pub fn completion(self) -> Result<PoolReport> {
        let Self {
            results,
            supervisor,
            ..
        } = self;
        drop(results);

        supervisor.join().unwrap_or_else(|_| {
            Err(Error::ChannelError {
                context: "pool supervisor thread panicked".to_string(),
            })
        })
    }
}

impl<T: Transform> Iterator for BlockingResults<T> {
    type Item = Outcome<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.results.recv().ok()
    }
}

pub(crate) fn spawn_blocking_pool<T: Transform>(
    config: &PoolConfig,
    transform: Arc<T>,
    jobs: Vec<T::Input>,
    cancel: CancellationToken,
) -> Result<BlockingResults<T>> {
    let batch_len = jobs.len();
    let num_workers = config.num_workers;

    let (job_tx, job_rx) = crossbeam_channel::bounded(config.job_capacity_for(batch_len));
    let (result_tx, result_rx) = crossbeam_channel::bounded(config.result_capacity_for(batch_len));
    let barrier = Arc::new(CompletionBarrier::new(num_workers));

    for worker_id in 1..=num_workers {
        let jobs = job_rx.clone();
        let results = result_tx.clone();
        let transform = Arc::clone(&transform);
        let job_delay = config.job_delay;
        let worker_cancel = cancel.clone();
        let guard = WorkerGuard::new(worker_id, Arc::clone(&barrier));

        let spawned = thread::Builder::new()
            .name(format!("jobpool-worker-{worker_id}"))
            .spawn(move || {
                blocking_worker_loop(
                    worker_id,
                    &jobs,
                    &results,
                    transform.as_ref(),
                    job_delay,
                    &worker_cancel,
                    guard,
                );
            });

        // A failed spawn drops the closure, and with it the guard, so the
        // barrier still counts this worker as done.
        if let Err(e) = spawned {
            cancel.cancel();
            return Err(Error::Spawn {
                context: format!("worker {worker_id}: {e}"),
            });
        }
    }
    drop(job_rx);

    let supervisor_cancel = cancel.clone();
    let supervisor = thread::Builder::new()
        .name("jobpool-supervisor".to_string())
        .spawn(move || {
            let fed = feed_jobs_blocking(jobs, job_tx, &supervisor_cancel);
            barrier.wait_blocking();
            drop(result_tx);

            #[cfg(feature = "tracing")]
            tracing::debug!("Result sink closed");

            finalize(batch_len, fed, &barrier, &supervisor_cancel)
        })
        .map_err(|e| {
            cancel.cancel();
            Error::Spawn {
                context: format!("supervisor: {e}"),
            }
        })?;

    Ok(BlockingResults {
        results: result_rx,
        supervisor,
        cancel,
    })
}

fn blocking_worker_loop<T: Transform>(
    worker_id: usize,
    jobs: &Receiver<T::Input>,
    results: &Sender<Outcome<T>>,
    transform: &T,
    job_delay: Duration,
    cancel: &CancellationToken,
    guard: WorkerGuard,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    while !cancel.is_cancelled() {
        let Ok(job) = jobs.recv() else {
            break;
        };

        announce_job(worker_id, &job);

        if !job_delay.is_zero() {
            thread::sleep(job_delay);
        }

        let Some(outcome) = apply_job_guarded(worker_id, transform, job, &guard) else {
            break;
        };

        let succeeded = outcome.is_ok();
        if results.send(outcome).is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Worker {worker_id} exiting, results were dropped");
            break;
        }
        record_delivery(guard.barrier(), succeeded);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");

    drop(guard);
}
