//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize tracing with the standard format
///
/// `RUST_LOG` wins when set, otherwise `level` applies to every target.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}
