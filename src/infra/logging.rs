//! Structured logging setup for the CLI.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes tracing to stderr.
///
/// Verbosity maps to `warn`, `info`, `debug`, `trace`. The `MDNOTES_LOG`
/// environment variable overrides the computed filter.
pub fn init_tracing(verbose: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_env("MDNOTES_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("mdnotes={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .try_init()?;

    Ok(())
}
