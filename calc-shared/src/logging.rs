//! Tracing subscriber initialization, shared by the orchestrator and worker
//! binaries.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber honoring `LOG_LEVEL` (falling back
/// to `info` when unset or invalid). Safe to call once per process; a second
/// call is a no-op rather than a panic, since tests may initialize logging
/// more than once across the suite.
pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
