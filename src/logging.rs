use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: human-readable lines on stderr, filtered by
/// `RUST_LOG` when set and by `level` otherwise. Calling it twice is a no-op.
pub fn init_logging(level: &str) {
    let default_filter = format!("drawdown={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .try_init();

    if installed.is_ok() {
        tracing::debug!(filter = %default_filter, "logging initialized");
    }
}
