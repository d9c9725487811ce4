//! Logging initialization shared by the CLI and tests.
//!
//! Quiet mode keeps stderr clean for user-facing output (warnings and errors
//! only). Verbose mode emits structured JSON events suitable for piping into
//! log tooling.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_logging(quiet: bool) {
    let default_directive = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env("MUXPLAN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    if quiet {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init();
    }
}
