//! The LiveReload sub-server: a dedicated plain-HTTP listener serving the
//! injectable client script and accepting WebSocket upgrades for the
//! protocol engine.
//!
//! The client script never changes while the process runs, so it is cache
//! controlled with a fixed synthetic validator instead of an mtime-derived
//! one.

use crate::error::{Result, ServeError};
use crate::livereload::protocol::{ClientSession, LiveReloadMessage, SessionAction};
use crate::livereload::registry::ClientRegistry;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, Method, Response, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

/// Fixed LiveReload port; the browser extensions and the client script all
/// assume it.
pub const LIVERELOAD_PORT: u16 = 35729;

/// Fixed validator for the client script.
const CLIENT_SCRIPT_ETAG: &str = "livereload";

const CLIENT_SCRIPT: &str = include_str!("../../assets/livereload.js");

/// The LiveReload sub-server.
pub struct LiveReloadServer {
    registry: Arc<ClientRegistry>,
}

impl LiveReloadServer {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Build the router: the client script, the upgrade path, 404 for
    /// everything else.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/livereload.js", get(client_script))
            .route("/livereload", get(upgrade))
            .layer(
                // allow all origins: pages on the main server's port fetch
                // the script cross-origin
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.registry.clone())
    }

    /// Bind the fixed port and serve until the process exits.
    pub async fn start(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], LIVERELOAD_PORT));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServeError::Server(format!("Failed to bind LiveReload port: {e}")))?;
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServeError::Server(format!("LiveReload server error: {e}")))
    }
}

/// `GET /livereload.js`: the injectable client script, 304 on a matching
/// conditional header, headers only for HEAD.
async fn client_script(method: Method, headers: HeaderMap) -> Response<Body> {
    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if if_none_match == Some(CLIENT_SCRIPT_ETAG) {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        return response;
    }

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::ETAG, CLIENT_SCRIPT_ETAG)
        .header(header::CONTENT_TYPE, "text/javascript");

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(CLIENT_SCRIPT)
    };
    builder.body(body).unwrap_or_else(|_| {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// `GET /livereload` with upgrade: hand the socket to the protocol engine.
async fn upgrade(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<ClientRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, registry))
}

/// Per-connection task: runs the handshake state machine over the socket.
///
/// A parse failure or failed negotiation closes the connection without an
/// error log; unsolicited probes are expected. Registered clients are
/// removed from the registry on the way out, whoever initiated the close.
async fn handle_connection(socket: WebSocket, registry: Arc<ClientRegistry>) {
    let (ws_tx, mut ws_rx) = socket.split();

    // outbound queue: broadcasts and handshake replies both go through it,
    // so a slow socket backpressures here instead of blocking the registry
    let (tx, mut rx) = mpsc::channel::<String>(16);
    let send_task = tokio::spawn(async move {
        let mut ws_tx = ws_tx;
        while let Some(text) = rx.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut session = ClientSession::new();
    let mut registered: Option<usize> = None;

    while let Some(Ok(message)) = ws_rx.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(parsed) = serde_json::from_str::<LiveReloadMessage>(text.as_str()) else {
            tracing::debug!("closing live-reload connection: unrecognized message");
            break;
        };
        match session.on_message(parsed) {
            SessionAction::Reply(reply) => {
                if send_json(&tx, &reply).await.is_err() {
                    break;
                }
            }
            SessionAction::ReplyAndRegister(reply) => {
                if send_json(&tx, &reply).await.is_err() {
                    break;
                }
                let id = registry.register(tx.clone());
                registered = Some(id);
                tracing::debug!(id, "live-reload client negotiated");
            }
            SessionAction::RecordOrigin(origin) => {
                if let Some(id) = registered {
                    registry.record_origin(id, origin);
                }
            }
            SessionAction::Ignore => {}
            SessionAction::Close => {
                tracing::debug!("closing live-reload connection: failed negotiation");
                break;
            }
        }
    }

    session.on_close();
    if let Some(id) = registered {
        registry.deregister(id);
        tracing::debug!(id, "live-reload client disconnected");
    }
    // dropping the last sender ends the outbound task, which closes the socket
    drop(tx);
    let _ = send_task.await;
}

async fn send_json(tx: &mpsc::Sender<String>, message: &LiveReloadMessage) -> Result<()> {
    let json = serde_json::to_string(message)?;
    tx.send(json)
        .await
        .map_err(|_| ServeError::Server("live-reload connection gone".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        LiveReloadServer::new(Arc::new(ClientRegistry::new())).router()
    }

    #[test]
    fn test_client_script_is_embedded() {
        assert!(CLIENT_SCRIPT.contains("livereload"));
        assert!(!CLIENT_SCRIPT.is_empty());
    }

    #[tokio::test]
    async fn test_client_script_served_with_fixed_etag() {
        let request = Request::builder()
            .uri("/livereload.js")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ETAG).unwrap(),
            CLIENT_SCRIPT_ETAG
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/javascript"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, CLIENT_SCRIPT.as_bytes());
    }

    #[tokio::test]
    async fn test_client_script_conditional_returns_304() {
        let request = Request::builder()
            .uri("/livereload.js")
            .header(header::IF_NONE_MATCH, CLIENT_SCRIPT_ETAG)
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_client_script_head_has_headers_only() {
        let request = Request::builder()
            .method("HEAD")
            .uri("/livereload.js")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ETAG).unwrap(),
            CLIENT_SCRIPT_ETAG
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
