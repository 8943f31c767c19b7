//! Test support: one-time tracing setup shared by unit and integration tests.

use std::env;
use std::sync::Once;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

static TEST_SETUP: Once = Once::new();

/// Install the test subscriber once per process. `RUST_LOG` defaults to `trace`.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // parser spans are too chatty even at trace
    let noisy_modules = ["tsconf::domain::expression::parser"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}
