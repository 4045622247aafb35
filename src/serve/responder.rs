//! Content responder: streams indexed file bytes with conditional caching
//! and optional on-the-fly compression.
//!
//! Exactly one response is produced per call. Errors never escape to the
//! caller as a crash: a stat failure surfaces as an error the front door
//! turns into a 500 (preserving the original 500-on-race behavior when a
//! file disappears between index lookup and stat), and a broken pipe
//! mid-stream simply drops the body stream.

use crate::error::{Result, ServeError};
use async_compression::Level;
use async_compression::tokio::bufread::{BrotliEncoder, GzipEncoder};
use axum::body::Body;
use axum::http::{HeaderMap, Method, Response, StatusCode, header};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::BufReader;
use tokio_util::io::ReaderStream;

/// Selected response encoding, in server preference order [brotli, gzip].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Brotli,
    Gzip,
}

impl Encoding {
    /// Value for the `Content-Encoding` header.
    pub fn header_value(self) -> &'static str {
        match self {
            Encoding::Brotli => "br",
            Encoding::Gzip => "gzip",
        }
    }
}

/// Pick an encoding from the client's `Accept-Encoding` header.
///
/// Brotli wins over gzip whenever both are advertised; anything else streams
/// raw bytes.
pub fn select_encoding(accept_encoding: Option<&str>) -> Option<Encoding> {
    let accepts: Vec<&str> = accept_encoding?
        .split(',')
        .map(|s| s.trim().split(';').next().unwrap_or("").trim())
        .collect();
    if accepts.contains(&"br") {
        Some(Encoding::Brotli)
    } else if accepts.contains(&"gzip") {
        Some(Encoding::Gzip)
    } else {
        None
    }
}

/// Cache validator derived from the file's modification time: the
/// millisecond mtime rendered in base 36. Monotonically increasing and
/// collision-resistant enough for a development server.
pub fn mtime_etag(mtime: SystemTime) -> String {
    let millis = mtime
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    to_base36(millis)
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

/// Content type derived from the file extension.
///
/// Unknown extensions fall back to the generic binary type.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "xml" => "application/xml",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => "application/octet-stream",
    }
}

/// Serve one indexed file.
///
/// Stats the target, answers 304 on a matching conditional header, ends
/// after headers for HEAD, and otherwise streams the file in chunks so a
/// slow client exerts backpressure instead of buffering the whole file.
///
/// Brotli runs at a fixed quality of 5: the streaming encoder exposes
/// neither a text mode nor an input size hint, so a mid-range quality
/// stands in for both.
pub async fn serve_file(
    compression: bool,
    method: &Method,
    headers: &HeaderMap,
    fs_path: &Path,
    url_path: &str,
) -> Result<Response<Body>> {
    let metadata = tokio::fs::metadata(fs_path).await?;
    let etag = mtime_etag(metadata.modified()?);

    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if if_none_match == Some(etag.as_str()) {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
            .map_err(|e| ServeError::Server(e.to_string()));
    }

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::ETAG, &etag)
        .header(header::CONTENT_TYPE, content_type_for(url_path));

    if method == Method::HEAD {
        return builder
            .body(Body::empty())
            .map_err(|e| ServeError::Server(e.to_string()));
    }

    let encoding = if compression {
        select_encoding(
            headers
                .get(header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        )
    } else {
        None
    };

    let file = tokio::fs::File::open(fs_path).await?;
    let reader = BufReader::new(file);

    let response = match encoding {
        Some(Encoding::Brotli) => builder
            .header(header::CONTENT_ENCODING, Encoding::Brotli.header_value())
            .body(Body::from_stream(ReaderStream::new(
                BrotliEncoder::with_quality(reader, Level::Precise(5)),
            ))),
        Some(Encoding::Gzip) => builder
            .header(header::CONTENT_ENCODING, Encoding::Gzip.header_value())
            .body(Body::from_stream(ReaderStream::new(
                GzipEncoder::with_quality(reader, Level::Best),
            ))),
        None => builder.body(Body::from_stream(ReaderStream::new(reader))),
    };

    response.map_err(|e| ServeError::Server(e.to_string()))
}
