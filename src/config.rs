//! Server configuration.
//!
//! [`ServerConfig`] is an immutable snapshot built once at startup from
//! validated CLI/env input and read-only thereafter. All invalid option
//! combinations are rejected here, before any listener binds.

use crate::cli::Cli;
use crate::error::{ConfigError, Result, ServeError};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

/// Default HTTPS port.
pub const DEFAULT_HTTPS_PORT: u16 = 4433;
/// Default port when serving plain HTTP.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// TLS key material source for the HTTPS listener.
#[derive(Debug, Clone)]
pub enum TlsMaterial {
    /// User-supplied certificate and key, each either a PEM file path or
    /// inline PEM text.
    Pem { cert: String, key: String },
    /// No explicit material: obtain a self-signed localhost certificate from
    /// the local provider.
    LocalProvider,
}

/// A single custom bootstrap target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapTarget {
    /// URL path of the script the synthesized HTML should load
    pub src: String,
    /// Load the script with `type="module"`
    pub module: bool,
}

/// Bootstrap configuration: the default index.js/index.mjs rule plus custom
/// per-path mappings.
#[derive(Debug, Clone, Default)]
pub struct BootstrapSpec {
    /// Synthesize HTML for directories that have index.js/index.mjs but no
    /// index.html
    pub default_enabled: bool,
    /// Treat default-bootstrap .js scripts as ES modules
    pub force_module: bool,
    /// Directory-style URL path -> bootstrap target
    pub custom: HashMap<String, BootstrapTarget>,
}

/// Immutable server configuration snapshot.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host or IP to bind to
    pub host: String,
    /// Requested port (the bound port may differ if this one is taken)
    pub port: u16,
    /// TLS material, or None for plain HTTP
    pub tls: Option<TlsMaterial>,
    /// Port for the HTTP-to-HTTPS redirect companion server
    pub redirect: Option<u16>,
    /// Compress responses when the client supports it
    pub compression: bool,
    /// Never substitute index.html for directory requests
    pub ignore_index: bool,
    /// Suppress directory listing HTML
    pub no_directory_listing: bool,
    /// Don't start the LiveReload sub-server
    pub no_live_reload: bool,
    /// URL path prefix every served path is namespaced under (no slashes)
    pub prefix: Option<String>,
    /// Bootstrap resolution rules
    pub bootstrap: BootstrapSpec,
    /// Filesystem root the index is enumerated from
    pub root: PathBuf,
    /// Bound to a non-loopback address (files reachable from other machines)
    pub public: bool,
}

impl ServerConfig {
    /// Build and validate the configuration from parsed CLI/env input.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for every invalid combination the original
    /// option contract names: HTTP+CERT, HTTP+REDIRECT, CERT without KEY,
    /// PASS without CERT, and overlapping bootstrap configuration.
    pub fn from_cli(cli: &Cli, default_root: PathBuf) -> Result<Self> {
        if cli.http && cli.cert.is_some() {
            return Err(ConfigError::ConflictingOptions(
                "HTTP and CERT (a certificate is only used with HTTPS servers)".to_string(),
            )
            .into());
        }
        if cli.http && cli.redirect.is_some() {
            return Err(ConfigError::ConflictingOptions(
                "HTTP and REDIRECT (a redirect server is only used with HTTPS servers)".to_string(),
            )
            .into());
        }
        if cli.cert.is_some() && cli.key.is_none() {
            return Err(ConfigError::MissingField {
                field: "KEY".to_string(),
                hint: "If using CERT you must also supply KEY".to_string(),
            }
            .into());
        }
        if cli.pass.is_some() && cli.cert.is_none() {
            return Err(ConfigError::MissingField {
                field: "CERT".to_string(),
                hint: "If using PASS you must also supply CERT and KEY".to_string(),
            }
            .into());
        }
        if cli.pass.is_some() {
            // rustls cannot decrypt passphrase-protected keys
            return Err(ConfigError::InvalidValue {
                field: "PASS".to_string(),
                value: "<redacted>".to_string(),
                hint: "Encrypted private keys are not supported; decrypt the key first \
                       (e.g. `openssl pkey -in key.pem -out key-plain.pem`)"
                    .to_string(),
            }
            .into());
        }

        let host = if cli.public {
            "::".to_string()
        } else {
            cli.host.clone().unwrap_or_else(|| "localhost".to_string())
        };
        let public = !is_loopback_host(&host);

        let tls = if cli.http {
            None
        } else if let (Some(cert), Some(key)) = (cli.cert.clone(), cli.key.clone()) {
            Some(TlsMaterial::Pem { cert, key })
        } else {
            if public {
                return Err(ConfigError::MissingField {
                    field: "CERT".to_string(),
                    hint: format!(
                        "Please supply your own certificate (CERT and KEY) for {host}, \
                         since a \"localhost\" certificate will not work with it"
                    ),
                }
                .into());
            }
            Some(TlsMaterial::LocalProvider)
        };

        let port = cli.port.unwrap_or(if cli.http {
            DEFAULT_HTTP_PORT
        } else {
            DEFAULT_HTTPS_PORT
        });

        let prefix = match cli.prefix.as_deref() {
            None | Some("") => None,
            Some(raw) => {
                let trimmed = raw.trim_matches('/');
                if trimmed.is_empty() || trimmed.contains('/') {
                    return Err(ConfigError::InvalidValue {
                        field: "PREFIX".to_string(),
                        value: raw.to_string(),
                        hint: "The prefix must be a single path segment, e.g. 'site'".to_string(),
                    }
                    .into());
                }
                Some(trimmed.to_string())
            }
        };

        let bootstrap = Self::parse_bootstrap(cli)?;

        Ok(Self {
            host,
            port,
            tls,
            redirect: cli.redirect,
            compression: cli.compression,
            ignore_index: cli.ignore_index,
            no_directory_listing: cli.no_directory_listing,
            no_live_reload: cli.no_live_reload,
            prefix,
            bootstrap,
            root: cli.root.clone().unwrap_or(default_root),
            public,
        })
    }

    /// Parse `--bootstrap` / `--map-bootstrap` input into a [`BootstrapSpec`].
    ///
    /// Mapping syntax: `path=src` or `path=src:module`. Keys are normalized to
    /// directory style (leading and trailing slash) since the resolver only
    /// consults them for directory requests. Combining the default rule with
    /// custom mappings is rejected rather than silently picking a precedence.
    fn parse_bootstrap(cli: &Cli) -> Result<BootstrapSpec> {
        let mut custom = HashMap::new();
        for raw in &cli.map_bootstrap {
            let Some((path, target)) = raw.split_once('=') else {
                return Err(ConfigError::InvalidValue {
                    field: "MAP_BOOTSTRAP".to_string(),
                    value: raw.clone(),
                    hint: "Expected 'path=src' or 'path=src:module'".to_string(),
                }
                .into());
            };
            let (src, module) = match target.strip_suffix(":module") {
                Some(src) => (src, true),
                None => (target, src_is_module(target)),
            };
            if path.is_empty() || src.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "MAP_BOOTSTRAP".to_string(),
                    value: raw.clone(),
                    hint: "Both the path and the script source must be non-empty".to_string(),
                }
                .into());
            }
            let key = format!("/{}/", path.trim_matches('/')).replace("//", "/");
            let src = if src.starts_with('/') {
                src.to_string()
            } else {
                format!("/{src}")
            };
            custom.insert(key, BootstrapTarget { src, module });
        }

        if cli.bootstrap && !custom.is_empty() {
            return Err(ConfigError::ConflictingOptions(
                "BOOTSTRAP and MAP_BOOTSTRAP (the default rule and custom mappings would \
                 overlap; pick one)"
                    .to_string(),
            )
            .into());
        }

        Ok(BootstrapSpec {
            default_enabled: cli.bootstrap,
            force_module: cli.bootstrap_module,
            custom,
        })
    }

    /// URL scheme the main server speaks.
    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() { "https" } else { "http" }
    }

    /// Displayable server URL for the given bound port.
    pub fn server_url(&self, bound_port: u16) -> String {
        format!(
            "{}://{}:{}",
            self.scheme(),
            display_host(&self.host),
            bound_port
        )
    }

    /// Resolve the configured host to a bindable socket address.
    pub fn bind_addr(&self, port: u16) -> Result<SocketAddr> {
        resolve_host(&self.host, port)
    }
}

/// Hosts that only ever resolve to the local machine.
pub fn is_loopback_host(host: &str) -> bool {
    match host.to_ascii_lowercase().as_str() {
        "localhost" | "127.0.0.1" | "::1" | "[::1]" => true,
        other => other
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
    }
}

/// Host as it should appear in a URL (IPv6 addresses bracketed, loopback
/// shown as localhost).
pub fn display_host(host: &str) -> String {
    match host {
        "127.0.0.1" | "::1" | "[::1]" | "localhost" => "localhost".to_string(),
        other => match other.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
            _ => other.to_string(),
        },
    }
}

fn resolve_host(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            ServeError::Config(ConfigError::InvalidValue {
                field: "HOST".to_string(),
                value: host.to_string(),
                hint: format!("The host did not resolve to an address ({e})"),
            })
        })?
        .next()
        .ok_or_else(|| {
            ServeError::Config(ConfigError::InvalidValue {
                field: "HOST".to_string(),
                value: host.to_string(),
                hint: "The host did not resolve to any address".to_string(),
            })
        })
}

fn src_is_module(src: &str) -> bool {
    src.ends_with(".mjs")
}

/// Probe the configured port, falling back to an OS-assigned ephemeral port
/// with a warning if it is already taken.
///
/// A privileged port we cannot bind surfaces as a descriptive error instead.
pub fn find_available_port(addr: SocketAddr) -> Result<u16> {
    use std::net::TcpListener;

    match TcpListener::bind(addr) {
        Ok(_) => Ok(addr.port()),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            crate::ui::warning(&format!(
                "Port {} is in use, trying another port...",
                addr.port()
            ));
            let ephemeral = TcpListener::bind(SocketAddr::new(addr.ip(), 0))
                .map_err(|e| ServeError::Server(format!("Failed to find a free port: {e}")))?;
            let port = ephemeral
                .local_addr()
                .map_err(|e| ServeError::Server(format!("Failed to read bound address: {e}")))?
                .port();
            Ok(port)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: addr.port().to_string(),
                hint: "No access to this port (ports 0 to 1023 require admin privileges)"
                    .to_string(),
            }
            .into())
        }
        Err(e) => Err(ServeError::Server(format!(
            "Failed to bind to {addr}: {e}"
        ))),
    }
}
