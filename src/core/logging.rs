//! Diagnostic logging. Reports go to stdout; everything here goes to stderr.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "NOXIS_LOG";

pub fn default_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Install the global subscriber. `NOXIS_LOG` wins over `--verbose`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}
