//! The file-serving HTTP layer.
//!
//! The front door dispatches every request through the resolution chain:
//! bootstrap (for directory-style paths), indexed file, directory listing,
//! 404. Any error escaping a handler is contained there and degraded to a
//! 500 with the error text as plain body; the server keeps serving.

pub mod bootstrap;
pub mod listing;
pub mod responder;

use crate::config::ServerConfig;
use crate::error::{Result, ServeError};
use crate::index::SharedIndex;
use crate::tls;
use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, Response, StatusCode, Uri, header};
use axum_server::Handle;
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for the front door handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub index: SharedIndex,
}

/// The main file server.
pub struct FileServer {
    state: AppState,
}

impl FileServer {
    pub fn new(config: Arc<ServerConfig>, index: SharedIndex) -> Self {
        Self {
            state: AppState { config, index },
        }
    }

    /// Build the axum router. Every path goes through the front door.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(front_door)
            .with_state(self.state.clone())
    }

    /// Bind and serve until the handle is shut down.
    ///
    /// The listener speaks HTTPS unless the configuration says plain HTTP.
    pub async fn start(self, addr: SocketAddr, handle: Handle) -> Result<()> {
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let served = match &self.state.config.tls {
            Some(material) => {
                let tls_config = tls::rustls_config(material).await?;
                axum_server::bind_rustls(addr, tls_config)
                    .handle(handle)
                    .serve(app)
                    .await
            }
            None => axum_server::bind(addr).handle(handle).serve(app).await,
        };

        served.map_err(|e| ServeError::Server(format!("Server error: {e}")))
    }
}

/// Request dispatcher. Exactly one response per request; failures become a
/// 500 with the error text, logged, never fatal.
async fn front_door(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Response<Body> {
    let (response, error) = match handle_request(&state, &method, &headers, &uri).await {
        Ok(response) => (response, None),
        Err(e) => (internal_error_response(&e), Some(e)),
    };

    // the original never exposes peer addresses in local-only mode
    let remote = if state.config.public {
        peer.ip().to_string()
    } else {
        "127.0.0.1".to_string()
    };
    match error {
        None => tracing::info!("{} {} {} {}", remote, response.status().as_u16(), method, uri),
        Some(e) => tracing::info!(
            "{} {} {} {} ({})",
            remote,
            response.status().as_u16(),
            method,
            uri,
            e
        ),
    }

    response
}

async fn handle_request(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Response<Body>> {
    let url_path = percent_decode_str(uri.path())
        .decode_utf8()
        .map_err(|e| ServeError::Server(format!("Invalid request path encoding: {e}")))?
        .to_string();

    if url_path.ends_with('/') {
        match bootstrap::resolve(
            &state.config.bootstrap,
            state.config.ignore_index,
            &state.index,
            &url_path,
        ) {
            bootstrap::BootstrapOutcome::ServeIndexHtml(index_path) => {
                serve_indexed(state, method, headers, &index_path).await
            }
            bootstrap::BootstrapOutcome::Synthesize { src, module } => {
                html_response(bootstrap::render_html(&src, module))
            }
            bootstrap::BootstrapOutcome::Pass => {
                if state.config.no_directory_listing {
                    not_found_response()
                } else {
                    html_response(listing::render_listing(&state.index.snapshot(), &url_path))
                }
            }
        }
    } else if state.index.contains(&url_path) {
        serve_indexed(state, method, headers, &url_path).await
    } else {
        not_found_response()
    }
}

async fn serve_indexed(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    url_path: &str,
) -> Result<Response<Body>> {
    let fs_path = state
        .index
        .fs_path_for(url_path)
        .ok_or_else(|| ServeError::Server(format!("Unmappable indexed path: {url_path}")))?;
    responder::serve_file(state.config.compression, method, headers, &fs_path, url_path).await
}

fn html_response(html: String) -> Result<Response<Body>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(html))
        .map_err(|e| ServeError::Server(e.to_string()))
}

fn not_found_response() -> Result<Response<Body>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::empty())
        .map_err(|e| ServeError::Server(e.to_string()))
}

fn internal_error_response(error: &ServeError) -> Response<Body> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(error.to_string()))
        .unwrap_or_else(|_| {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
}
