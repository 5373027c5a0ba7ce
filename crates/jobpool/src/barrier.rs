//! Completion barrier shared by the workers of one dispatch.
//!
//! The barrier starts at the number of workers and counts down as each worker
//! terminates. Reaching zero *releases* it, which is the signal the supervisor
//! uses to close the result sink. Waiting is supported from async code
//! ([`CompletionBarrier::wait`]) and from plain threads
//! ([`CompletionBarrier::wait_blocking`]).
//!
//! Workers never call [`CompletionBarrier::arrive`] directly. They hold a
//! [`WorkerGuard`], which arrives on drop, so a worker that panics still
//! releases its slot.

use crate::{Error, Result};
use parking_lot::{Condvar, Mutex};
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Totals for one dispatch, read once the barrier is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    /// Number of workers that ran.
    pub workers: usize,
    /// `Ok` outcomes accepted by the result sink.
    pub processed: usize,
    /// Tagged `Err` outcomes accepted by the result sink.
    pub failed: usize,
}

impl PoolReport {
    /// Outcomes delivered, successful or not.
    pub const fn total(&self) -> usize {
        self.processed + self.failed
    }
}

#[derive(Debug)]
pub struct CompletionBarrier {
    workers: usize,
    remaining: AtomicUsize,
    processed: AtomicUsize,
    failed: AtomicUsize,
    // 0 means no worker panicked; worker ids start at 1.
    panicked: AtomicUsize,
    notify: Notify,
    lock: Mutex<()>,
    released: Condvar,
}

impl CompletionBarrier {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            remaining: AtomicUsize::new(workers),
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
            notify: Notify::new(),
            lock: Mutex::new(()),
            released: Condvar::new(),
        }
    }

    /// Workers that have not yet terminated.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.remaining() == 0
    }

    /// Marks one worker as terminated, waking every waiter if it was the last.
    ///
    /// Extra arrivals after release are ignored.
    pub fn arrive(&self) {
        let prev = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        if prev == Ok(1) {
            #[cfg(feature = "tracing")]
            tracing::debug!("All {} workers terminated, barrier released", self.workers);

            self.notify.notify_waiters();
            // Taking the lock orders this notify after any blocking waiter's
            // check of `remaining`.
            let _guard = self.lock.lock();
            self.released.notify_all();
        }
    }

    /// Waits until every worker has terminated.
    pub async fn wait(&self) {
        loop {
            // Register before checking so a release in between is not missed.
            let notified = self.notify.notified();
            if self.is_released() {
                return;
            }
            notified.await;
        }
    }

    /// Blocks the current thread until every worker has terminated.
    pub fn wait_blocking(&self) {
        let mut guard = self.lock.lock();
        while !self.is_released() {
            self.released.wait(&mut guard);
        }
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_panic(&self, worker_id: usize) {
        let _ = self
            .panicked
            .compare_exchange(0, worker_id, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Current totals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPanicked`] naming the first worker that
    /// panicked, if any did.
    pub fn report(&self) -> Result<PoolReport> {
        match self.panicked.load(Ordering::Acquire) {
            0 => Ok(PoolReport {
                workers: self.workers,
                processed: self.processed.load(Ordering::Relaxed),
                failed: self.failed.load(Ordering::Relaxed),
            }),
            worker_id => Err(Error::WorkerPanicked { worker_id }),
        }
    }
}

/// Holds one worker's slot in a [`CompletionBarrier`] and arrives on drop.
#[derive(Debug)]
pub struct WorkerGuard {
    worker_id: usize,
    barrier: Arc<CompletionBarrier>,
}

impl WorkerGuard {
    pub const fn new(worker_id: usize, barrier: Arc<CompletionBarrier>) -> Self {
        Self { worker_id, barrier }
    }

    pub fn barrier(&self) -> &CompletionBarrier {
        &self.barrier
    }

    /// Records that this worker's job panicked and the panic was caught.
    pub(crate) fn mark_panicked(&self) {
        #[cfg(feature = "tracing")]
        tracing::error!("Worker {} panicked", self.worker_id);
        self.barrier.record_panic(self.worker_id);
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            #[cfg(feature = "tracing")]
            tracing::error!("Worker {} panicked", self.worker_id);
            self.barrier.record_panic(self.worker_id);
        }
        self.barrier.arrive();
    }
}
