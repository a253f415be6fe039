//! Logging setup for binaries and tests.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! caller's job. `RUST_LOG` takes precedence over the verbosity level.

use tracing_subscriber::EnvFilter;

/// Map a `-v` count to a default filter directive.
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install a stderr fmt subscriber. Calling it again is a no-op.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    // `try_init` fails only when a global subscriber already exists.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
