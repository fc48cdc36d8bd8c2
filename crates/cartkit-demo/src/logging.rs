#![forbid(unsafe_code)]

//! Diagnostic output for the demo binary.

use tracing_subscriber::EnvFilter;

/// Variable holding an `EnvFilter` directive, e.g. `cartkit_store=debug`.
pub const LOG_ENV: &str = "CARTKIT_LOG";

/// Filter from `CARTKIT_LOG`, or `debug`/`warn` depending on `verbose`.
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_filter(verbose))
}

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    }
}

/// Install a stderr subscriber. Does nothing if one is already set.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
