//! # Logging
//!
//! Everything goes through `tracing`. The pool emits:
//!
//! - `info`: one `Worker <id> processing job <job>` event per job, plus a
//!   summary when the pool finishes.
//! - `warn`: jobs whose transform failed.
//! - `debug`: dispatch, job source and result sink lifecycle.
//! - `trace`: individual worker start/stop.
//!
//! Events are written to stdout next to the `Result: <value>` lines so the two
//! interleave the way they happen. Verbosity follows `RUST_LOG` and defaults to
//! `info`, e.g.:
//!
//! ```bash
//! RUST_LOG=jobpool=trace cargo run -- --jobs 10 --workers 4
//! ```

use crate::config::LogFormat;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::MakeWriter,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    match format {
        LogFormat::Plain => registry.with(plain_layer(std::io::stdout)).try_init()?,
        LogFormat::Compact => registry
            .with(
                fmt.with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                    .with_target(false)
                    .compact(),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                fmt.with_thread_ids(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                    .with_file(true)
                    .pretty(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt.with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                    .json(),
            )
            .try_init()?,
    }

    Ok(())
}

/// Bare messages, one per line, e.g. `Worker 2 processing job 7`.
fn plain_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .without_time()
        .with_level(false)
        .with_target(false)
        .compact()
}
