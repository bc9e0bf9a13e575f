use anyhow::bail;
use clap::Parser;
use core::num::NonZeroUsize;
use core::time::Duration;
use jobpool::PoolConfig;

/// Runtime configuration for the `jobpool-demo` binary.
///
/// Every value can come from a CLI flag or an environment variable (a `.env`
/// file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "jobpool-demo",
    version,
    about = "Pushes synthetic sleep jobs through a fixed-size worker pool"
)]
pub struct CliArgs {
    /// Number of worker threads in the pool.
    ///
    /// Defaults to the number of logical CPUs.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS")]
    pub num_workers: Option<usize>,

    /// Capacity of the pending-job queue. Submissions beyond it are rejected
    /// and retried by the driver after `RETRY_BACKOFF_MS`.
    ///
    /// Environment variable: `MAX_PENDING_JOBS`
    #[arg(long, env = "MAX_PENDING_JOBS", default_value_t = 16)]
    pub max_pending_jobs: usize,

    /// Total number of jobs to submit.
    ///
    /// Environment variable: `JOB_COUNT`
    #[arg(long, env = "JOB_COUNT", default_value_t = 100)]
    pub job_count: usize,

    /// Shortest simulated job duration, in milliseconds.
    ///
    /// Environment variable: `MIN_JOB_MS`
    #[arg(long, env = "MIN_JOB_MS", default_value_t = 1)]
    pub min_job_ms: u64,

    /// Longest simulated job duration, in milliseconds.
    ///
    /// Environment variable: `MAX_JOB_MS`
    #[arg(long, env = "MAX_JOB_MS", default_value_t = 25)]
    pub max_job_ms: u64,

    /// Make every Nth job panic to exercise failure isolation. 0 disables.
    ///
    /// Environment variable: `PANIC_EVERY`
    #[arg(long, env = "PANIC_EVERY", default_value_t = 0)]
    pub panic_every: usize,

    /// Pause between retries of a rejected submission, in milliseconds.
    ///
    /// Environment variable: `RETRY_BACKOFF_MS`
    #[arg(long, env = "RETRY_BACKOFF_MS", default_value_t = 1)]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub pool: PoolConfig,
    pub job_count: usize,
    pub min_job: Duration,
    pub max_job: Duration,
    pub panic_every: Option<NonZeroUsize>,
    pub retry_backoff: Duration,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let num_workers = args.num_workers.unwrap_or_else(num_cpus::get);

        if num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.min_job_ms > args.max_job_ms {
            bail!(
                "MIN_JOB_MS ({}) must not exceed MAX_JOB_MS ({})",
                args.min_job_ms,
                args.max_job_ms
            );
        }

        let pool = PoolConfig::new(num_workers, args.max_pending_jobs)
            .with_thread_name("jobpool-demo");
        pool.validate()?;

        Ok(Self {
            pool,
            job_count: args.job_count,
            min_job: Duration::from_millis(args.min_job_ms),
            max_job: Duration::from_millis(args.max_job_ms),
            panic_every: NonZeroUsize::new(args.panic_every),
            retry_backoff: Duration::from_millis(args.retry_backoff_ms),
        })
    }
}
