//! Error types for the worker pool.
//!
//! There are two layers of failure:
//!
//! - [`Error`] covers the pool itself: bad configuration, a queue closing
//!   underneath the dispatcher, cancellation, or a worker task panicking.
//! - [`TransformError`] is a *per-job* failure. It travels through the result
//!   stream as an `Err` item tagged with the job that produced it, so a single
//!   bad job never takes down its worker or its siblings.

use core::fmt;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Pool-level error.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The pool configuration was rejected before any worker was spawned.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The pool was cancelled before every job was handed to a worker.
    #[error("Pool was cancelled")]
    Cancelled,

    /// A worker or supervisor thread could not be started.
    #[error("Failed to spawn thread: {context}")]
    Spawn { context: String },

    /// A worker task panicked while processing a job.
    #[error("Worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },
}

/// A job that could not be transformed.
///
/// Carries both the originating job and the cause so the consumer can decide
/// what to do with it (retry, log, drop).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformError<J, E> {
    /// The job that failed.
    pub job: J,
    /// Why it failed.
    pub cause: E,
}

impl<J, E> TransformError<J, E> {
    pub const fn new(job: J, cause: E) -> Self {
        Self { job, cause }
    }
}

impl<J: fmt::Debug, E: fmt::Display> fmt::Display for TransformError<J, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {:?} failed: {}", self.job, self.cause)
    }
}

impl<J: fmt::Debug, E: fmt::Debug + fmt::Display> core::error::Error for TransformError<J, E> {}
