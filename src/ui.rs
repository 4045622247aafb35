//! Terminal UI utilities for formatted status output.
//!
//! Status lines go to stderr so they never mix with anything piped from
//! stdout. Color support degrades gracefully when the terminal (or a CI
//! environment) doesn't support it.

use owo_colors::OwoColorize;

/// Initialize color support based on terminal capabilities.
///
/// Respects `NO_COLOR` and disables console colors when stderr is not a TTY.
pub fn init_colors() {
    if !crate::logger::should_use_colors() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
}

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}
