use crate::{CompletionBarrier, Error, PoolReport, Result};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Enqueues every job, then closes the job source.
///
/// Dropping `job_tx` on return is what tells workers there is no more work.
/// With the default batch-sized queue every send completes immediately; with a
/// smaller queue this task waits for workers to make room.
///
/// # Errors
///
/// - [`Error::Cancelled`] if `cancel` fires before every job was enqueued.
/// - [`Error::ChannelError`] if every worker is gone while jobs remain.
pub(crate) async fn feed_jobs<J>(
    jobs: Vec<J>,
    job_tx: mpsc::Sender<J>,
    cancel: CancellationToken,
) -> Result<()> {
    let total = jobs.len();

    for (i, job) in jobs.into_iter().enumerate() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            sent = job_tx.send(job) => {
                if sent.is_err() {
                    return Err(Error::ChannelError {
                        context: format!("job source closed after {i} of {total} jobs"),
                    });
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Enqueued {total} jobs, closing job source");

    Ok(())
}

/// Thread flavor of [`feed_jobs`].
pub(crate) fn feed_jobs_blocking<J>(
    jobs: Vec<J>,
    job_tx: crossbeam_channel::Sender<J>,
    cancel: &CancellationToken,
) -> Result<()> {
    let total = jobs.len();

    for (i, job) in jobs.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if job_tx.send(job).is_err() {
            return Err(Error::ChannelError {
                context: format!("job source closed after {i} of {total} jobs"),
            });
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Enqueued {total} jobs, closing job source");

    Ok(())
}

/// Waits for the completion barrier, then closes the result sink.
///
/// The supervisor holds the last `result_tx` that is not owned by a worker, so
/// the consumer's stream ends exactly when this function drops it: after every
/// worker has terminated and never before.
pub(crate) async fn supervise<O>(
    batch_len: usize,
    feeder: JoinHandle<Result<()>>,
    barrier: Arc<CompletionBarrier>,
    result_tx: mpsc::Sender<O>,
    cancel: CancellationToken,
) -> Result<PoolReport> {
    let fed = match feeder.await {
        Ok(fed) => fed,
        Err(e) => Err(Error::ChannelError {
            context: format!("job feeder failed: {e}"),
        }),
    };

    barrier.wait().await;
    drop(result_tx);

    #[cfg(feature = "tracing")]
    tracing::debug!("Result sink closed");

    finalize(batch_len, fed, &barrier, &cancel)
}

/// Computes the report for a finished dispatch.
///
/// A worker panic wins over cancellation, which wins over a feeder failure.
/// A batch that ends short without being cancelled means the consumer dropped
/// its results, and is reported as a [`Error::ChannelError`].
pub(crate) fn finalize(
    batch_len: usize,
    fed: Result<()>,
    barrier: &CompletionBarrier,
    cancel: &CancellationToken,
) -> Result<PoolReport> {
    let report = barrier.report()?;

    if cancel.is_cancelled() && report.total() < batch_len {
        return Err(Error::Cancelled);
    }
    fed?;

    if report.total() < batch_len {
        return Err(Error::ChannelError {
            context: format!(
                "result stream dropped after {} of {batch_len} jobs",
                report.total()
            ),
        });
    }

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Pool finished: {} workers, {} processed, {} failed",
        report.workers,
        report.processed,
        report.failed
    );

    Ok(report)
}
