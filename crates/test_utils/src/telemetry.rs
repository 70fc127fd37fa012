//! Tracing setup for test runs

use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` isn't set
pub const DEFAULT_FILTER: &str = "warn";

/// Installs a subscriber that writes through the test harness
///
/// Safe to call from every test; only the first call installs anything.
/// Output is captured per test and shown only for failures.
pub fn init_test_tracing() {
    init_test_tracing_with(DEFAULT_FILTER);
}

/// Like [`init_test_tracing`], with a fallback filter of your choosing
pub fn init_test_tracing_with(fallback: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(fallback))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        // another subscriber may already be installed by the test binary
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer().with_target(true))
            .try_init();
    });
}
