//! HTTP-to-HTTPS redirect companion server.
//!
//! When a redirect port is configured, every request to it gets a 301 to the
//! equivalent URL on the main HTTPS listener. A bind failure here is a
//! logged warning, not a startup error: the main server is already up.

use crate::error::{Result, ServeError};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Response, StatusCode, Uri, header};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
struct RedirectTarget {
    host: String,
    port: u16,
}

/// Build the redirect router; exposed for tests.
pub fn router(host: String, main_port: u16) -> Router {
    Router::new()
        .fallback(redirect)
        .with_state(Arc::new(RedirectTarget {
            host,
            port: main_port,
        }))
}

async fn redirect(State(target): State<Arc<RedirectTarget>>, uri: Uri) -> Response<Body> {
    let location = format!("https://{}:{}{}", target.host, target.port, uri);
    tracing::info!("Redirecting to: {location}");
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::LOCATION, &location)
        .body(Body::empty())
        .unwrap_or_else(|_| {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
}

/// Bind and serve the redirect listener.
///
/// `display_host` is the hostname clients should be sent to; `main_port` is
/// the actually bound port of the HTTPS server.
pub async fn start(
    addr: SocketAddr,
    display_host: String,
    main_port: u16,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServeError::Server(format!("Failed to bind redirect port: {e}")))?;
    axum::serve(listener, router(display_host, main_port))
        .await
        .map_err(|e| ServeError::Server(format!("Redirect server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_redirects_to_https_equivalent() {
        let app = router("localhost".to_string(), 4433);
        let request = axum::http::Request::builder()
            .uri("/site/index.html?q=1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://localhost:4433/site/index.html?q=1"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
