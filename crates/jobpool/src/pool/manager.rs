//! Fan-out/fan-in worker pool.
//!
//! This module defines the [`WorkerPool`] struct, which runs a fixed number of
//! workers over a shared, bounded job source and collects their outcomes into
//! a shared, bounded result sink. Each call to [`WorkerPool::dispatch`] is an
//! independent batch with its own queues, workers and completion barrier.
//!
//! The shutdown sequence for a batch is cooperative:
//!
//! 1. The feeder enqueues every job and closes the job source.
//! 2. Workers drain the source and terminate when it is empty.
//! 3. The supervisor waits for the completion barrier and closes the result
//!    sink, which ends the consumer's stream.
//!
//! A shared [`CancellationToken`] can cut step 2 short.

use super::{
    coordinator::{feed_jobs, supervise},
    stream::ResultStream,
    threaded::{BlockingResults, spawn_blocking_pool},
    worker::worker_loop,
};
use crate::{CompletionBarrier, PoolConfig, Result, Transform, WorkerGuard};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// A reusable pool definition: how many workers, and what they do to each job.
#[derive(Debug)]
pub struct WorkerPool<T: Transform> {
    config: PoolConfig,
    transform: Arc<T>,
}

impl<T: Transform> Clone for WorkerPool<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<T: Transform> WorkerPool<T> {
    /// Validates `config` and builds a pool around `transform`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if the config is rejected by
    /// [`PoolConfig::validate`].
    pub fn new(config: PoolConfig, transform: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transform: Arc::new(transform),
        })
    }

    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Runs `jobs` through the pool on the current tokio runtime.
    ///
    /// Returns immediately; outcomes are pulled from the returned stream as
    /// workers produce them.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn dispatch(&self, jobs: impl IntoIterator<Item = T::Input>) -> ResultStream<T> {
        self.dispatch_with_token(jobs, CancellationToken::new())
    }

    /// Like [`WorkerPool::dispatch`], but workers stop pulling jobs once
    /// `cancel` fires. Passing a child of an application-wide token ties the
    /// batch to the application's shutdown.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn dispatch_with_token(
        &self,
        jobs: impl IntoIterator<Item = T::Input>,
        cancel: CancellationToken,
    ) -> ResultStream<T> {
        let jobs: Vec<_> = jobs.into_iter().collect();
        let batch_len = jobs.len();
        let num_workers = self.config.num_workers;

        let (job_tx, job_rx) = mpsc::channel(self.config.job_capacity_for(batch_len));
        let (result_tx, result_rx) = mpsc::channel(self.config.result_capacity_for(batch_len));

        let job_rx = Arc::new(Mutex::new(job_rx));
        let barrier = Arc::new(CompletionBarrier::new(num_workers));

        #[cfg(feature = "tracing")]
        tracing::debug!("Dispatching {batch_len} jobs across {num_workers} workers");

        for worker_id in 1..=num_workers {
            tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&job_rx),
                result_tx.clone(),
                Arc::clone(&self.transform),
                self.config.job_delay,
                cancel.clone(),
                WorkerGuard::new(worker_id, Arc::clone(&barrier)),
            ));
        }
        // Workers now own the only handles to the job source.
        drop(job_rx);

        let feeder = tokio::spawn(feed_jobs(jobs, job_tx, cancel.clone()));
        let supervisor = tokio::spawn(supervise(
            batch_len,
            feeder,
            barrier,
            result_tx,
            cancel.clone(),
        ));

        ResultStream::new(ReceiverStream::new(result_rx), supervisor, cancel)
    }

    /// Runs `jobs` through the pool on dedicated OS threads.
    ///
    /// Needs no async runtime.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Spawn`] if a worker thread could not be
    /// started. Workers that did start are cancelled.
    pub fn dispatch_blocking(
        &self,
        jobs: impl IntoIterator<Item = T::Input>,
    ) -> Result<BlockingResults<T>> {
        self.dispatch_blocking_with_token(jobs, CancellationToken::new())
    }

    /// Like [`WorkerPool::dispatch_blocking`], but workers stop pulling jobs
    /// once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Spawn`] if a worker thread could not be
    /// started.
    pub fn dispatch_blocking_with_token(
        &self,
        jobs: impl IntoIterator<Item = T::Input>,
        cancel: CancellationToken,
    ) -> Result<BlockingResults<T>> {
        spawn_blocking_pool(
            &self.config,
            Arc::clone(&self.transform),
            jobs.into_iter().collect(),
            cancel,
        )
    }
}
