use crate::config::RunConfig;
use futures::StreamExt;
use jobpool::{CancellationToken, Doubler, Outcome, PoolReport, WorkerPool};
use std::io::Write;

/// Runs the configured batch and writes one line per outcome to `out`.
///
/// Successful jobs print as `Result: <value>`, failed ones as
/// `Error: <cause>`, in whatever order workers finish them.
pub async fn run_pool(
    config: &RunConfig,
    cancel: CancellationToken,
    out: &mut impl Write,
) -> anyhow::Result<PoolReport> {
    let pool = WorkerPool::new(config.pool.clone(), Doubler)?;

    let report = if config.threaded {
        // The threaded pool hands back a blocking iterator; keep it off the
        // async worker threads' hot path.
        tokio::task::block_in_place(|| -> anyhow::Result<PoolReport> {
            let mut results = pool.dispatch_blocking_with_token(config.jobs(), cancel)?;
            for outcome in results.by_ref() {
                write_outcome(out, outcome)?;
            }
            Ok(results.completion()?)
        })?
    } else {
        let mut results = pool.dispatch_with_token(config.jobs(), cancel);
        while let Some(outcome) = results.next().await {
            write_outcome(out, outcome)?;
        }
        results.completion().await?
    };

    out.flush()?;
    Ok(report)
}

fn write_outcome(out: &mut impl Write, outcome: Outcome<Doubler>) -> std::io::Result<()> {
    match outcome {
        Ok(value) => writeln!(out, "Result: {value}"),
        Err(e) => writeln!(out, "Error: {e}"),
    }
}
