use clap::{Parser, ValueEnum};
use core::{ops::RangeInclusive, time::Duration};
use jobpool::{DEFAULT_NUM_WORKERS, PoolConfig};

/// How log lines (including the per-job `Worker <id> processing job <job>`
/// trace) are rendered on stdout.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Bare messages: no timestamp, level or target.
    #[default]
    Plain,
    /// Single-line records with timestamp and level.
    Compact,
    /// Multi-line records with source locations and thread ids.
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

/// Runtime configuration for the `jobpool` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "jobpool",
    version,
    about = "Doubles a batch of integer jobs across a pool of concurrent workers"
)]
pub struct CliArgs {
    /// Number of jobs to run. Jobs are the integers `1..=jobs`.
    ///
    /// Environment variable: `JOBPOOL_JOBS`
    #[arg(short, long, env = "JOBPOOL_JOBS", default_value_t = 5)]
    pub jobs: u32,

    /// Number of concurrent workers draining the job queue.
    ///
    /// Environment variable: `JOBPOOL_WORKERS`
    #[arg(short, long, env = "JOBPOOL_WORKERS", default_value_t = DEFAULT_NUM_WORKERS)]
    pub workers: usize,

    /// Simulated processing time per job, in milliseconds.
    ///
    /// Environment variable: `JOBPOOL_JOB_DELAY_MS`
    #[arg(long, env = "JOBPOOL_JOB_DELAY_MS", default_value_t = 100)]
    pub job_delay_ms: u64,

    /// Run workers on OS threads instead of tokio tasks.
    #[arg(long, env = "JOBPOOL_THREADED", default_value_t = false)]
    pub threaded: bool,

    /// Log output format.
    ///
    /// Environment variable: `JOBPOOL_LOG_FORMAT`
    #[arg(long, env = "JOBPOOL_LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub job_count: u32,
    pub pool: PoolConfig,
    pub threaded: bool,
    pub log_format: LogFormat,
}

impl RunConfig {
    /// The batch handed to the pool.
    pub fn jobs(&self) -> RangeInclusive<i64> {
        1..=i64::from(self.job_count)
    }
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let pool = PoolConfig::with_workers(args.workers)
            .job_delay(Duration::from_millis(args.job_delay_ms));
        pool.validate()?;

        Ok(Self {
            job_count: args.jobs,
            pool,
            threaded: args.threaded,
            log_format: args.log_format,
        })
    }
}
