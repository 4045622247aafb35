//! Live-reload protocol engine.
//!
//! A dedicated listener separate from the file server (fixed port 35729)
//! with two responsibilities: serving the static client-injection script
//! over plain HTTP, and running the per-connection LiveReload handshake over
//! WebSocket. Negotiated clients form the active registry that filesystem
//! change events are broadcast to.

pub mod protocol;
pub mod registry;
pub mod server;

pub use protocol::{
    ClientSession, LiveReloadMessage, PROTOCOL_CONNECTION_CHECK, PROTOCOL_OFFICIAL_7, Phase,
    SessionAction,
};
pub use registry::ClientRegistry;
pub use server::{LIVERELOAD_PORT, LiveReloadServer};
