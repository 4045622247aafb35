//! dev-serve - a local development file server with live reload.
//!
//! Serves a directory tree over HTTP/HTTPS, watches the filesystem for
//! changes, and notifies connected browsers to reload through the
//! LiveReload WebSocket protocol.
//!
//! # Architecture
//!
//! - [`index`] - The in-memory set of servable paths, fed by the watcher
//! - [`serve`] - The file-serving HTTP layer: front door, content responder,
//!   bootstrap resolution, directory listing
//! - [`livereload`] - The LiveReload protocol engine and its sub-server
//! - [`redirect`] - The HTTP-to-HTTPS redirect companion
//! - [`config`] - Validated, immutable server configuration
//! - [`error`] - Structured error types with actionable messages
//! - [`logger`] / [`ui`] - tracing setup and terminal output
//!
//! Requests can only ever resolve to files the index enumerated from disk,
//! which makes the server traversal-proof by construction.

// Public modules
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod index;
pub mod livereload;
pub mod logger;
pub mod redirect;
pub mod serve;
pub mod tls;
pub mod ui;

// Re-export commonly used types
pub use config::{BootstrapSpec, ServerConfig};
pub use error::{ConfigError, Result, ServeError};
pub use index::{FileIndex, SharedIndex};
