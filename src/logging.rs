//! Diagnostic logging setup for the binary.

use tracing_subscriber::EnvFilter;

/// Default filter directive for the given CLI flags.
///
/// `RUST_LOG` overrides this when set.
pub fn default_directive(quiet: bool, verbosity: u8) -> &'static str {
    match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

/// Install a stderr `fmt` subscriber. Safe to call more than once.
pub fn init_logging(quiet: bool, verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbosity)));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("logging already initialized, keeping existing subscriber");
    }
}
