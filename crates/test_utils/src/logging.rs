//! Tracing setup for tests
//!
//! Output goes through the test writer so it is captured per test and shown
//! only on failure. Set `RUST_LOG` to change the level (default `warn`).

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Another harness may have installed a subscriber already
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// Installs the test subscriber once per test binary
pub fn init_test_tracing() {
    Lazy::force(&TRACING);
}
