use crate::{CompletionBarrier, Outcome, Transform, TransformError, WorkerGuard};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Emits the per-job trace line before the job's simulated work starts.
#[allow(clippy::used_underscore_binding)]
pub(crate) fn announce_job<J: core::fmt::Debug>(_worker_id: usize, _job: &J) {
    #[cfg(feature = "tracing")]
    tracing::info!("Worker {_worker_id} processing job {_job:?}");
}

/// Runs the transform on a single job.
///
/// A failing job is tagged with its input and returned as an `Err` outcome;
/// the caller forwards it like any other result and moves on to the next job.
#[allow(clippy::used_underscore_binding)]
pub(crate) fn apply_job<T: Transform>(
    _worker_id: usize,
    transform: &T,
    job: T::Input,
) -> Outcome<T> {
    transform.apply(&job).map_err(|cause| {
        #[cfg(feature = "tracing")]
        tracing::warn!("Worker {_worker_id} failed job {job:?}: {cause}");
        TransformError::new(job, cause)
    })
}

/// Counts an outcome on the barrier. Only called once the result sink has
/// accepted it, so the report never includes outcomes the consumer lost.
pub(crate) fn record_delivery(barrier: &CompletionBarrier, succeeded: bool) {
    if succeeded {
        barrier.record_processed();
    } else {
        barrier.record_failed();
    }
}

/// [`apply_job`] with the transform's panics contained.
///
/// Returns `None` if the transform panicked. The panic is recorded against
/// this worker, and the caller must stop pulling jobs.
pub(crate) fn apply_job_guarded<T: Transform>(
    worker_id: usize,
    transform: &T,
    job: T::Input,
    guard: &WorkerGuard,
) -> Option<Outcome<T>> {
    match catch_unwind(AssertUnwindSafe(|| apply_job(worker_id, transform, job))) {
        Ok(outcome) => Some(outcome),
        Err(_) => {
            guard.mark_panicked();
            None
        }
    }
}
