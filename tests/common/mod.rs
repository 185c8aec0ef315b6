use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber once per test binary so `debug!`/
/// `trace!` call sites inside the cache are visible under
/// `RUST_LOG=heimdall_cache=trace cargo test -- --nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
    });
}
