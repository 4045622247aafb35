//! Integration tests for the file-serving HTTP layer, driving the router
//! directly with tower's oneshot.

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode, header};
use dev_serve::config::{BootstrapSpec, BootstrapTarget, ServerConfig};
use dev_serve::index::FileIndex;
use dev_serve::serve::FileServer;
use http_body_util::BodyExt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_config(root: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "localhost".to_string(),
        port: 0,
        tls: None,
        redirect: None,
        compression: false,
        ignore_index: false,
        no_directory_listing: false,
        no_live_reload: true,
        prefix: None,
        bootstrap: BootstrapSpec::default(),
        root,
        public: false,
    }
}

fn app(config: ServerConfig) -> (Router, Arc<FileIndex>) {
    let index = Arc::new(FileIndex::new(
        config.root.clone(),
        config.prefix.clone(),
    ));
    index.scan().unwrap();
    let router = FileServer::new(Arc::new(config), index.clone())
        .router()
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 54321))));
    (router, index)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::http::Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("site")).unwrap();
    std::fs::write(dir.path().join("site/index.html"), "<h1>real index</h1>").unwrap();
    std::fs::write(dir.path().join("site/index.js"), "console.log('hi')").unwrap();
    std::fs::write(dir.path().join("readme.txt"), "hello world").unwrap();
    dir
}

#[tokio::test]
async fn get_returns_exact_file_contents() {
    let dir = site();
    let (app, _) = app(test_config(dir.path().to_path_buf()));

    let response = app.oneshot(get("/readme.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    assert!(response.headers().contains_key(header::ETAG));
    assert!(!response.headers().contains_key(header::CONTENT_ENCODING));
    assert_eq!(body_bytes(response).await, b"hello world");
}

#[tokio::test]
async fn conditional_get_returns_304_with_empty_body() {
    let dir = site();
    let (app, _) = app(test_config(dir.path().to_path_buf()));

    let first = app.clone().oneshot(get("/readme.txt")).await.unwrap();
    let etag = first.headers().get(header::ETAG).unwrap().clone();

    let request = Request::builder()
        .uri("/readme.txt")
        .header(header::IF_NONE_MATCH, etag)
        .body(Body::empty())
        .unwrap();
    let second = app.oneshot(request).await.unwrap();

    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(second).await.is_empty());
}

#[tokio::test]
async fn head_returns_headers_without_body() {
    let dir = site();
    let (app, _) = app(test_config(dir.path().to_path_buf()));

    let request = Request::builder()
        .method("HEAD")
        .uri("/readme.txt")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::ETAG));
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn unindexed_path_is_404() {
    let dir = site();
    let (app, _) = app(test_config(dir.path().to_path_buf()));

    let response = app.oneshot(get("/nope.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_paths_never_resolve() {
    let dir = site();
    let (app, index) = app(test_config(dir.path().to_path_buf()));

    // the index only ever holds enumerated real files
    for path in index.snapshot() {
        assert!(!path.split('/').any(|seg| seg == ".."));
    }

    let response = app
        .oneshot(get("/%2e%2e/%2e%2e/etc/passwd"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn index_html_wins_over_bootstrap() {
    let dir = site();
    let mut config = test_config(dir.path().to_path_buf());
    config.bootstrap.default_enabled = true;
    let (app, _) = app(config);

    let response = app.oneshot(get("/site/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"<h1>real index</h1>");
}

#[tokio::test]
async fn default_bootstrap_synthesizes_html() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("app")).unwrap();
    std::fs::write(dir.path().join("app/index.js"), "boot()").unwrap();

    let mut config = test_config(dir.path().to_path_buf());
    config.bootstrap.default_enabled = true;
    let (app, _) = app(config);

    let response = app.oneshot(get("/app/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains(r#"<script src="/app/index.js"></script>"#));
}

#[tokio::test]
async fn custom_bootstrap_maps_virtual_path() {
    let dir = site();
    let mut config = test_config(dir.path().to_path_buf());
    config.bootstrap.custom.insert(
        "/virtual/".to_string(),
        BootstrapTarget {
            src: "/site/index.js".to_string(),
            module: true,
        },
    );
    let (app, _) = app(config);

    let response = app.oneshot(get("/virtual/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains(r#"<script type="module" src="/site/index.js"></script>"#));
}

#[tokio::test]
async fn directory_listing_renders_entries() {
    let dir = site();
    let (app, _) = app(test_config(dir.path().to_path_buf()));

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("readme.txt"));
    assert!(body.contains(r#"<a href="/site/">site/</a>"#));
}

#[tokio::test]
async fn directory_listing_can_be_suppressed() {
    let dir = site();
    let mut config = test_config(dir.path().to_path_buf());
    config.no_directory_listing = true;
    let (app, _) = app(config);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn compression_prefers_brotli_over_gzip() {
    let dir = site();
    let mut config = test_config(dir.path().to_path_buf());
    config.compression = true;
    let (app, _) = app(config);

    let request = Request::builder()
        .uri("/readme.txt")
        .header(header::ACCEPT_ENCODING, "gzip, br")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "br"
    );
}

#[tokio::test]
async fn compression_falls_back_to_gzip() {
    let dir = site();
    let mut config = test_config(dir.path().to_path_buf());
    config.compression = true;
    let (app, _) = app(config);

    let request = Request::builder()
        .uri("/readme.txt")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );
}

#[tokio::test]
async fn no_accepted_encoding_streams_raw_bytes() {
    let dir = site();
    let mut config = test_config(dir.path().to_path_buf());
    config.compression = true;
    let (app, _) = app(config);

    let response = app.oneshot(get("/readme.txt")).await.unwrap();
    assert!(!response.headers().contains_key(header::CONTENT_ENCODING));
    assert_eq!(body_bytes(response).await, b"hello world");
}

#[tokio::test]
async fn unlinked_file_returns_404_after_index_removal() {
    let dir = site();
    let (app, index) = app(test_config(dir.path().to_path_buf()));

    let before = app.clone().oneshot(get("/readme.txt")).await.unwrap();
    assert_eq!(before.status(), StatusCode::OK);

    // what the watcher does on an unlink event
    index.remove("/readme.txt");

    let after = app.oneshot(get("/readme.txt")).await.unwrap();
    assert_eq!(after.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn added_file_becomes_servable() {
    let dir = site();
    let (app, index) = app(test_config(dir.path().to_path_buf()));

    std::fs::write(dir.path().join("fresh.txt"), "fresh").unwrap();
    // what the watcher does on an add event
    let url = index
        .url_path_for(&dir.path().join("fresh.txt"))
        .unwrap();
    index.insert(url);

    let response = app.oneshot(get("/fresh.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"fresh");
}

#[tokio::test]
async fn prefix_namespaces_every_path() {
    let dir = site();
    let mut config = test_config(dir.path().to_path_buf());
    config.prefix = Some("base".to_string());
    let (app, _) = app(config);

    let prefixed = app.clone().oneshot(get("/base/readme.txt")).await.unwrap();
    assert_eq!(prefixed.status(), StatusCode::OK);
    assert_eq!(body_bytes(prefixed).await, b"hello world");

    let bare = app.oneshot(get("/readme.txt")).await.unwrap();
    assert_eq!(bare.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stat_race_degrades_to_500_with_error_text() {
    let dir = site();
    let (app, index) = app(test_config(dir.path().to_path_buf()));

    // indexed but gone from disk: the benign lookup/stat race
    std::fs::remove_file(dir.path().join("readme.txt")).unwrap();
    assert!(index.contains("/readme.txt"));

    let response = app.oneshot(get("/readme.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_bytes(response).await.is_empty());
}
