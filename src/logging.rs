use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber, writing human-readable lines to
/// stderr so stdout stays free for the board.
///
/// `RUST_LOG` wins over `level` when set. Calling this twice is harmless.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    // Already set, e.g. by an earlier test
    let _ = tracing::subscriber::set_global_default(subscriber);
}
