use crate::{Error, Outcome, PoolReport, Result, Transform};
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use futures::Stream;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Lazy sequence of outcomes from one dispatch.
///
/// Items arrive in completion order, not job order. The stream ends by itself
/// once every worker has terminated and the result sink has been closed.
///
/// ```
/// # #[tokio::main(flavor = "multi_thread")]
/// # async fn main() -> jobpool::Result<()> {
/// use futures::StreamExt;
///
/// let mut doubled: Vec<i64> = jobpool::dispatch(1..=5, 3)?
///     .filter_map(|outcome| async move { outcome.ok() })
///     .collect()
///     .await;
/// doubled.sort_unstable();
/// assert_eq!(doubled, vec![2, 4, 6, 8, 10]);
/// # Ok(())
/// # }
/// ```
pub struct ResultStream<T: Transform> {
    inner: ReceiverStream<Outcome<T>>,
    supervisor: JoinHandle<Result<PoolReport>>,
    cancel: CancellationToken,
}

impl<T: Transform> ResultStream<T> {
    pub(crate) const fn new(
        inner: ReceiverStream<Outcome<T>>,
        supervisor: JoinHandle<Result<PoolReport>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner,
            supervisor,
            cancel,
        }
    }

    /// Asks every worker to stop after its current job.
    ///
    /// Results already produced are still delivered, then the stream ends.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the pool has shut down.
    ///
    /// Any results not yet consumed are discarded; workers blocked on a full
    /// result queue see the closed sink and exit.
    ///
    /// # Errors
    ///
    /// - [`Error::WorkerPanicked`] if a worker panicked.
    /// - [`Error::Cancelled`] if the pool was cancelled before every job ran.
    /// - [`Error::ChannelError`] if the job source closed early, or if this
    ///   stream was dropped before every job's outcome was accepted.
    pub async fn completion(self) -> Result<PoolReport> {
        let Self {
            inner, supervisor, ..
        } = self;
        drop(inner);

        match supervisor.await {
            Ok(report) => report,
            Err(e) => Err(Error::ChannelError {
                context: format!("pool supervisor failed: {e}"),
            }),
        }
    }
}

impl<T: Transform> Stream for ResultStream<T> {
    type Item = Outcome<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
