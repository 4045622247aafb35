//! Logging infrastructure built on the `tracing` ecosystem.
//!
//! Supports multiple verbosity levels, colored output, and environment-based
//! configuration for debugging.
//!
//! # Verbosity Levels
//!
//! The logging level is determined in this order:
//! 1. `--verbose` flag: DEBUG for dev-serve
//! 2. `--quiet` flag: ERROR only
//! 3. `RUST_LOG` environment variable: custom filter
//! 4. Default: INFO for dev-serve

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified options.
///
/// Call once at program start, before any logging occurs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("dev_serve=debug")
    } else if quiet {
        EnvFilter::new("dev_serve=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dev_serve=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Check if colored output should be enabled.
///
/// # Environment Variables
///
/// - `NO_COLOR`: if set, disables colors
/// - `FORCE_COLOR`: if set, forces colors even in non-TTY
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::Term::stdout().features().colors_supported()
}
