//! Command-line interface definition.
//!
//! Defines the complete CLI structure using clap v4's derive macros. Every
//! serving option is reachable both as a flag and as an environment variable,
//! so `PORT=8080 COMPRESSION=1 dev-serve` and `dev-serve --port 8080
//! --compression` are equivalent.
//!
//! Cross-field validation (conflicting options, missing key material) happens
//! in [`crate::config::ServerConfig::from_cli`], which fails fast before any
//! listener binds.

use clap::Parser;
use clap::builder::BoolishValueParser;
use std::path::PathBuf;

/// dev-serve - serve the current directory with HTTPS and live reload
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dev-serve",
    version,
    about = "A local development file server with live reload",
    long_about = "dev-serve serves the current directory over HTTP or HTTPS,\n\
                  watches the filesystem for changes, and notifies connected\n\
                  browsers to reload through the LiveReload protocol."
)]
pub struct Cli {
    /// Host or IP address to bind to
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on (defaults to 4433 for HTTPS, 8080 for HTTP)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Bind to all interfaces ('::'), exposing the files to the network
    #[arg(long, env = "PUBLIC", conflicts_with = "host", value_parser = BoolishValueParser::new())]
    pub public: bool,

    /// Serve plain HTTP instead of HTTPS
    #[arg(long, env = "HTTP", value_parser = BoolishValueParser::new())]
    pub http: bool,

    /// TLS certificate: a PEM file path or inline PEM text
    #[arg(long, env = "CERT")]
    pub cert: Option<String>,

    /// TLS private key: a PEM file path or inline PEM text
    #[arg(long, env = "KEY")]
    pub key: Option<String>,

    /// Passphrase for an encrypted private key
    #[arg(long, env = "PASS")]
    pub pass: Option<String>,

    /// Run an HTTP-to-HTTPS redirect server on this port
    #[arg(long, env = "REDIRECT")]
    pub redirect: Option<u16>,

    /// Compress responses (brotli or gzip, by client preference)
    #[arg(long, env = "COMPRESSION", value_parser = BoolishValueParser::new())]
    pub compression: bool,

    /// Never answer directory requests with their index.html
    #[arg(long, env = "IGNORE_INDEX", value_parser = BoolishValueParser::new())]
    pub ignore_index: bool,

    /// Serve everything namespaced under this URL path prefix
    #[arg(long, env = "PREFIX")]
    pub prefix: Option<String>,

    /// For directories without index.html, synthesize an HTML page loading
    /// their index.js or index.mjs
    #[arg(long, env = "BOOTSTRAP", value_parser = BoolishValueParser::new())]
    pub bootstrap: bool,

    /// Load default-bootstrap scripts as ES modules even for .js files
    #[arg(long, env = "BOOTSTRAP_MODULE", value_parser = BoolishValueParser::new())]
    pub bootstrap_module: bool,

    /// Map a virtual URL path to a bootstrap script, as `path=src` or
    /// `path=src:module` (repeatable, comma-separated in the env variable)
    #[arg(long = "map-bootstrap", env = "MAP_BOOTSTRAP", value_delimiter = ',')]
    pub map_bootstrap: Vec<String>,

    /// Disable the LiveReload sub-server
    #[arg(long, env = "NO_LIVE_RELOAD", value_parser = BoolishValueParser::new())]
    pub no_live_reload: bool,

    /// Disable directory listing HTML for unmatched directory paths
    #[arg(long, env = "NO_DIRECTORY_LISTING", value_parser = BoolishValueParser::new())]
    pub no_directory_listing: bool,

    /// Directory to serve (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
