//! HTTP response building module
//!
//! Builders for the error responses produced before or instead of a handler,
//! plus [`write_error`] for handlers that fail part way.

use crate::http::sink::ResponseSink;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, X_CONTENT_TYPE_OPTIONS,
};
use hyper::{Response, StatusCode};

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::NOT_FOUND, "404 page not found\n")
}

/// Build 405 Method Not Allowed response listing the allowed methods
pub fn build_405_response(allow: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(CONTENT_TYPE, PLAIN_TEXT)
        .header("Allow", allow)
        .body(Full::new(Bytes::from("405 Method Not Allowed\n")))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large\n")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error\n")
}

fn build_text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, PLAIN_TEXT)
        .header(X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Reply to the request with a plain-text error message
///
/// Clears body framing and validators the handler may have set up. Has no visible
/// effect on a sink whose head is already committed.
pub fn write_error(w: &mut dyn ResponseSink, status: StatusCode, message: &str) {
    let headers = w.headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.remove(ETAG);
    headers.remove(LAST_MODIFIED);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    w.write_status(status);
    let _ = writeln!(w, "{message}");
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::sink::ResponseWriter;

    #[test]
    fn test_405_lists_methods() {
        let resp = build_405_response("GET, HEAD");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "GET, HEAD");
    }

    #[test]
    fn test_write_error() {
        let mut w = ResponseWriter::new();
        w.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("100"));
        w.headers_mut()
            .insert(ETAG, HeaderValue::from_static("\"abc\""));
        write_error(&mut w, StatusCode::INTERNAL_SERVER_ERROR, "boom");

        assert_eq!(w.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(w.body(), b"boom\n");
        let resp = w.into_response();
        assert!(resp.headers().get(CONTENT_LENGTH).is_none());
        assert!(resp.headers().get(ETAG).is_none());
        assert_eq!(resp.headers()[CONTENT_TYPE], PLAIN_TEXT);
    }
}
