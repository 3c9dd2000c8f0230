//! Logging bootstrap for the CLI.

use tracing_subscriber::EnvFilter;

/// Initializes tracing output on stderr.
///
/// Stdout stays reserved for forwarded in-page console messages and
/// checkpoint lines. `RUST_LOG` overrides the verbosity flags.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
