use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Sets up logging, configurable via environment variable `PINDECK_LOG`.
///
/// Call this once at application startup. Safe to skip in tests; failures to
/// install the subscriber (e.g. one is installed already) are ignored.
pub fn setup_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_env("PINDECK_LOG"))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
