use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber once per test binary, so `RUST_LOG=trace
/// cargo test -- --nocapture` surfaces the container/lifecycle/supervisor
/// log lines each integration test exercises indirectly.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}
