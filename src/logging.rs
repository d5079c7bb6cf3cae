//! Diagnostic logging.
//!
//! Diagnostics go to stderr, so stdout carries only the console report.
//! Filters are read from the `RANKPOST_LOG` environment variable, using the
//! usual `tracing` directive syntax (`debug`, `rankpost::root=trace`, ...).
//! The default level is `warn`.

use std::sync::Once;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// ENV used to set the log filters
const FILTER_ENV: &str = "RANKPOST_LOG";

/// Once instance to ensure the logger is only initialized once
static INIT: Once = Once::new();

/// Install the global subscriber. Calling this more than once is harmless.
pub fn init() {
    INIT.call_once(setup_logging);
}

fn setup_logging() {
    let layer = fmt::layer()
        .compact()
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .with_filter(filters());
    // Another subscriber may already be installed, e.g. by a test harness.
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

fn filters() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(FILTER_ENV)
        .from_env_lossy()
}
