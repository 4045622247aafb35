//! Serve command implementation.
//!
//! Orchestrates the entire server lifecycle:
//! - Configuration validation (fail fast before any listener binds)
//! - Initial index scan of the serving root
//! - File watching feeding index mutations and reload broadcasts
//! - Main HTTPS/HTTP listener, LiveReload sub-server, optional redirect server
//! - Graceful shutdown on Ctrl+C

use crate::cli::Cli;
use crate::config::{self, ServerConfig, find_available_port};
use crate::error::{Result, ServeError};
use crate::index::{FileChange, FileIndex, IndexWatcher};
use crate::livereload::{ClientRegistry, LiveReloadServer};
use crate::redirect;
use crate::serve::FileServer;
use crate::ui;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

/// Execute the serve command.
///
/// # Process Flow
///
/// 1. Build and validate [`ServerConfig`]
/// 2. Scan the serving root into the [`FileIndex`]
/// 3. Start the filesystem watcher
/// 4. Probe the port, then start the main listener
/// 5. Start the LiveReload sub-server and the redirect companion
/// 6. Main event loop: apply watch events, broadcast reloads, handle Ctrl+C
pub async fn execute(cli: Cli) -> Result<()> {
    ui::info("Starting dev-serve...");

    let default_root = std::env::current_dir()?;
    let config = Arc::new(ServerConfig::from_cli(&cli, default_root)?);
    log_configuration(&config);

    let index = Arc::new(FileIndex::new(config.root.clone(), config.prefix.clone()));

    ui::info(&format!(
        "Scanning for files to serve in: {}",
        config.root.display()
    ));
    // watch before scanning so nothing created in between is missed
    let (watcher, mut change_rx) = IndexWatcher::new(config.root.clone())?;
    let count = index.scan()?;
    ui::success(&format!(
        "{} files found, starting the {} server...",
        count,
        config.scheme().to_uppercase()
    ));

    let requested = config.bind_addr(config.port)?;
    let port = find_available_port(requested)?;
    let addr = SocketAddr::new(requested.ip(), port);

    let registry = Arc::new(ClientRegistry::new());
    if !config.no_live_reload {
        ui::info("Starting the LiveReload server...");
        let live_reload = LiveReloadServer::new(registry.clone());
        tokio::spawn(async move {
            if let Err(e) = live_reload.start().await {
                ui::warning(&format!("LiveReload server failed: {e}"));
            }
        });
    }

    let handle = axum_server::Handle::new();
    let server = FileServer::new(config.clone(), index.clone());
    let server_handle = handle.clone();
    let mut server_task = tokio::spawn(async move { server.start(addr, server_handle).await });

    let Some(bound) = handle.listening().await else {
        // the server stopped before it could listen; surface its error
        return match server_task.await {
            Ok(result) => result.and(Err(ServeError::Server(
                "Server stopped before listening".to_string(),
            ))),
            Err(e) => Err(ServeError::Server(format!("Server task failed: {e}"))),
        };
    };
    announce(&config, bound.port());

    if let Some(redirect_port) = config.redirect {
        start_redirect(&config, redirect_port, bound.port());
    }

    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(change) = change_rx.recv() => {
                handle_file_change(change, &config, &index, &registry).await;
            }

            result = &mut server_task => {
                drop(watcher);
                return match result {
                    Ok(outcome) => outcome,
                    Err(e) => Err(ServeError::Server(format!("Server task failed: {e}"))),
                };
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down...");
                handle.shutdown();
                return Ok(());
            }
        }
    }
}

/// Apply one watcher event: adds and removes mutate the index, content
/// changes fan out to the live-reload clients.
async fn handle_file_change(
    change: FileChange,
    config: &ServerConfig,
    index: &FileIndex,
    registry: &ClientRegistry,
) {
    match change {
        FileChange::Created(path) => {
            if !path.is_file() {
                return;
            }
            if let Some(url_path) = index.url_path_for(&path) {
                tracing::debug!("indexed {url_path}");
                index.insert(url_path);
            }
        }
        FileChange::Modified(path) => {
            if config.no_live_reload {
                return;
            }
            if let Some(url_path) = index.url_path_for(&path) {
                let notified = registry.broadcast_reload(&url_path).await;
                tracing::debug!("{url_path} changed, notified {notified} client(s)");
            }
        }
        FileChange::Removed(path) => {
            if let Some(url_path) = index.url_path_for(&path) {
                tracing::debug!("unindexed {url_path}");
                index.remove(&url_path);
            }
        }
    }
}

fn log_configuration(config: &ServerConfig) {
    tracing::info!(
        host = %config.host,
        port = config.port,
        scheme = config.scheme(),
        compression = config.compression,
        prefix = config.prefix.as_deref().unwrap_or(""),
        "Current configuration"
    );
}

fn announce(config: &ServerConfig, bound_port: u16) {
    ui::success(&format!(
        "Ready for connections on: {}",
        config.server_url(bound_port)
    ));
    if config.public {
        ui::warning(
            "THE SERVED FILES ARE AVAILABLE TO ANY OTHER COMPUTER WHICH CAN REACH THIS ADDRESS!",
        );
    } else {
        ui::info("(no access allowed outside of your computer)");
    }
}

fn start_redirect(config: &ServerConfig, redirect_port: u16, main_port: u16) {
    let display_host = config::display_host(&config.host);
    let redirect_addr = match config.bind_addr(redirect_port) {
        Ok(addr) => addr,
        Err(e) => {
            ui::warning(&format!(
                "Setting up a HTTP to HTTPS redirect server on port {redirect_port} failed: {e}"
            ));
            return;
        }
    };
    ui::info(&format!(
        "Setting up a HTTP to HTTPS redirect server on port {redirect_port}."
    ));
    tokio::spawn(async move {
        if let Err(e) = redirect::start(redirect_addr, display_host, main_port).await {
            ui::warning(&format!("Redirect server failed: {e}"));
        }
    });
}
