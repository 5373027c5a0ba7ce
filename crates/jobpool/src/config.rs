//! Pool configuration.
//!
//! ## Key Concepts
//! - **Fan-out**: `num_workers` concurrent workers share one job source.
//! - **Backpressure**: both queues are bounded. By default they are sized to
//!   the batch so neither the dispatcher nor the workers ever wait for
//!   capacity. Smaller capacities are allowed; the dispatcher's feeder task
//!   then waits for workers to make room.
//! - **Simulated work**: every job sleeps for `job_delay` before it is
//!   transformed. Set it to zero to measure raw dispatch overhead.

use crate::{Error, Result};
use core::time::Duration;

/// Number of workers used when none is specified.
pub const DEFAULT_NUM_WORKERS: usize = 3;

/// Per-job processing delay used when none is specified.
pub const DEFAULT_JOB_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub num_workers: usize,
    pub job_delay: Duration,
    /// `None` sizes the job queue to the batch.
    pub job_queue_capacity: Option<usize>,
    /// `None` sizes the result queue to the batch.
    pub result_queue_capacity: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_NUM_WORKERS,
            job_delay: DEFAULT_JOB_DELAY,
            job_queue_capacity: None,
            result_queue_capacity: None,
        }
    }
}

impl PoolConfig {
    /// A default config with `num_workers` workers.
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    #[must_use]
    pub const fn job_delay(mut self, job_delay: Duration) -> Self {
        self.job_delay = job_delay;
        self
    }

    #[must_use]
    pub const fn job_queue_capacity(mut self, capacity: usize) -> Self {
        self.job_queue_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub const fn result_queue_capacity(mut self, capacity: usize) -> Self {
        self.result_queue_capacity = Some(capacity);
        self
    }

    /// Checks that the config can run a pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `num_workers` is zero or either
    /// explicit queue capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::InvalidConfig {
                reason: "num_workers must be greater than 0".to_string(),
            });
        }
        if self.job_queue_capacity == Some(0) {
            return Err(Error::InvalidConfig {
                reason: "job_queue_capacity must be greater than 0".to_string(),
            });
        }
        if self.result_queue_capacity == Some(0) {
            return Err(Error::InvalidConfig {
                reason: "result_queue_capacity must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Job queue capacity for a batch of `batch_len` jobs (never zero).
    pub fn job_capacity_for(&self, batch_len: usize) -> usize {
        self.job_queue_capacity.unwrap_or(batch_len).max(1)
    }

    /// Result queue capacity for a batch of `batch_len` jobs (never zero).
    pub fn result_capacity_for(&self, batch_len: usize) -> usize {
        self.result_queue_capacity.unwrap_or(batch_len).max(1)
    }
}
