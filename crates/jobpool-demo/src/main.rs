//! `jobpool-demo`: drives a [`jobpool::Dispatcher`] with synthetic sleep jobs
//! and reports how the work was spread across workers.
//!
//! ```bash
//! NUM_WORKERS=4 MAX_PENDING_JOBS=8 JOB_COUNT=200 PANIC_EVERY=25 RUST_LOG=debug \
//!     cargo run -p jobpool-demo
//! ```

mod config;
mod load;
mod telemetry;

use clap::Parser;
use config::{CliArgs, DemoConfig};
use telemetry::init_tracing;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_tracing()?;
    log_startup_info(&config);

    let summary = load::drive(&config)?;
    tracing::info!("Demo finished in {:?}", summary.elapsed);
    print!("{summary}");

    Ok(())
}

fn log_startup_info(config: &DemoConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting demo with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting demo with {} workers, {} pending slots, {} jobs",
            config.pool.max_workers,
            config.pool.max_pending_jobs,
            config.job_count
        );
    }
}
