//! Console logging for the demo binary.
//!
//! Events from the pool's worker and pairing threads carry the thread name
//! (`jobpool-demo-3`, `jobpool-demo-dispatch`), so logs show which worker did
//! what. Verbosity follows `RUST_LOG` and defaults to `info`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_names(true)
                .with_line_number(true)
                .with_target(false),
        )
        .try_init()?;

    // Job panics are reported through exit notifications; keep the default
    // hook from printing a backtrace banner for each one.
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!("{info}");
    }));

    Ok(())
}
