use std::sync::Once;

static INIT: Once = Once::new();

/// Route the engine's `tracing` events to stdout for the duration of a test run.
/// Run `cargo test -- --nocapture` with `RUST_LOG=trace` to see them.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}
