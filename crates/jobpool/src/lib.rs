#![doc = include_str!("../README.md")]

mod barrier;
mod config;
mod error;
pub mod pool;
mod transform;

pub use crate::barrier::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::pool::{
    BlockingResults, Outcome, ResultStream, WorkerPool, dispatch, dispatch_blocking,
};
pub use crate::transform::*;
// Re-exported so callers can build tokens for `dispatch_with_token` without a
// direct `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;
