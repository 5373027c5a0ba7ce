use super::processor::{announce_job, apply_job_guarded, record_delivery};
use crate::{Outcome, Transform, WorkerGuard};
use core::time::Duration;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// The job source as seen by workers.
///
/// `mpsc` has a single receiver, so workers take turns on it through an async
/// mutex. Whoever holds the lock gets the next job; the lock is released before
/// the job is processed.
pub(crate) type SharedJobs<J> = Arc<Mutex<mpsc::Receiver<J>>>;

/// Worker task that drains the shared job source.
///
/// The worker pulls one job at a time, sleeps `job_delay` to simulate work,
/// transforms the job and pushes the outcome to the result sink. It stops when:
///
/// - the job source is closed and empty (the normal path),
/// - `cancel` fires (checked between pulls), or
/// - the result sink is gone because the consumer dropped its stream.
///
/// A panicking transform also ends the worker; the panic is recorded on the
/// completion barrier instead of unwinding through the task.
///
/// `guard` is held for the whole loop and releases this worker's slot in the
/// completion barrier when the task ends.
pub(crate) async fn worker_loop<T: Transform>(
    worker_id: usize,
    jobs: SharedJobs<T::Input>,
    results: mpsc::Sender<Outcome<T>>,
    transform: Arc<T>,
    job_delay: Duration,
    cancel: CancellationToken,
    guard: WorkerGuard,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    while let Some(job) = next_job(&jobs, &cancel).await {
        announce_job(worker_id, &job);

        if !job_delay.is_zero() {
            tokio::time::sleep(job_delay).await;
        }

        let Some(outcome) = apply_job_guarded(worker_id, transform.as_ref(), job, &guard) else {
            break;
        };

        let succeeded = outcome.is_ok();
        if results.send(outcome).await.is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Worker {worker_id} exiting, result stream was dropped");
            break;
        }
        record_delivery(guard.barrier(), succeeded);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");

    drop(guard);
}

/// Pulls the next job, or `None` once the source is exhausted or the pool is
/// cancelled.
async fn next_job<J>(jobs: &SharedJobs<J>, cancel: &CancellationToken) -> Option<J> {
    if cancel.is_cancelled() {
        return None;
    }

    let mut rx = jobs.lock().await;
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        job = rx.recv() => job,
    }
}
