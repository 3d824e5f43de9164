use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Use RUST_LOG, fall back to `info` when unset or unparsable.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // A second init (e.g. several runs in one test binary) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
