//! Response sink module
//!
//! Handlers write their output into a [`ResponseSink`]: a header map, an
//! optional explicit status and a body stream. [`ResponseWriter`] is the sink
//! that becomes the hyper response for one request.

use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::io;

/// Fully buffered inbound request
pub type Request = hyper::Request<Bytes>;

/// Percent-decoded request path, the form routes and asset names use
pub fn request_path(req: &Request) -> Cow<'_, str> {
    percent_decode_str(req.uri().path()).decode_utf8_lossy()
}

/// Destination for one response
pub trait ResponseSink: io::Write {
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Set the response status explicitly
    fn write_status(&mut self, status: StatusCode);
}

/// A request handler writing into a sink
pub trait Handler: Send + Sync {
    fn serve(&self, w: &mut dyn ResponseSink, req: &Request);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseSink, &Request) + Send + Sync,
{
    fn serve(&self, w: &mut dyn ResponseSink, req: &Request) {
        self(w, req);
    }
}

/// The real response sink for one request
///
/// The response head is committed by the first explicit status write or the
/// first body write, whichever comes first. Header mutations made after that
/// point no longer reach the client.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: HeaderMap,
    head: Option<(StatusCode, HeaderMap)>,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the status line and headers are already fixed
    pub const fn is_committed(&self) -> bool {
        self.head.is_some()
    }

    /// Status that will be sent
    pub fn status(&self) -> StatusCode {
        self.head.as_ref().map_or(StatusCode::OK, |(status, _)| *status)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    fn commit(&mut self, status: StatusCode) {
        if self.head.is_none() {
            self.head = Some((status, self.headers.clone()));
        }
    }

    /// Convert into a hyper response, dropping the body for bodiless statuses
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let (status, headers) = self
            .head
            .unwrap_or_else(|| (StatusCode::OK, self.headers));

        let bodiless = status == StatusCode::NOT_MODIFIED
            || status == StatusCode::NO_CONTENT
            || status.is_informational();
        let body = if bodiless {
            Bytes::new()
        } else {
            Bytes::from(self.body)
        };

        let mut builder = Response::builder().status(status);
        if let Some(map) = builder.headers_mut() {
            map.extend(headers);
            if bodiless {
                map.remove(CONTENT_LENGTH);
            }
        }

        builder.body(Full::new(body)).unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build {status} response: {e}"));
            Response::new(Full::new(Bytes::new()))
        })
    }
}

impl ResponseSink for ResponseWriter {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        if let Some((committed, _)) = &self.head {
            logger::log_warning(&format!(
                "Superfluous status write: {status} after {committed}"
            ));
            return;
        }
        self.commit(status);
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.commit(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderValue, CONTENT_TYPE, ETAG};
    use std::io::Write;

    #[test]
    fn test_default_status_is_ok() {
        let mut w = ResponseWriter::new();
        w.write_all(b"hi").unwrap();
        assert_eq!(w.status(), StatusCode::OK);
        assert_eq!(w.body(), b"hi");
    }

    #[test]
    fn test_headers_before_commit_are_sent() {
        let mut w = ResponseWriter::new();
        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        w.write_all(b"hi").unwrap();
        let resp = w.into_response();
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_headers_after_status_write_are_dropped() {
        let mut w = ResponseWriter::new();
        w.write_status(StatusCode::CREATED);
        w.headers_mut()
            .insert(ETAG, HeaderValue::from_static("\"late\""));
        assert!(w.is_committed());
        let resp = w.into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(resp.headers().get(ETAG).is_none());
    }

    #[test]
    fn test_superfluous_status_write_ignored() {
        let mut w = ResponseWriter::new();
        w.write_status(StatusCode::ACCEPTED);
        w.write_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(w.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_not_modified_has_no_body_or_length() {
        let mut w = ResponseWriter::new();
        w.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("5"));
        w.write_status(StatusCode::NOT_MODIFIED);
        w.write_all(b"hello").unwrap();
        let resp = w.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert!(resp.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_closure_handler() {
        let handler = |w: &mut dyn ResponseSink, _req: &Request| {
            let _ = w.write_all(b"from closure");
        };
        let req = Request::new(Bytes::new());
        let mut w = ResponseWriter::new();
        handler.serve(&mut w, &req);
        assert_eq!(w.body(), b"from closure");
    }

    #[test]
    fn test_request_path_is_decoded() {
        let req = hyper::Request::builder()
            .uri("/docs/a%20b%2Bc.txt?x=%20")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(request_path(&req), "/docs/a b+c.txt");

        let plain = hyper::Request::builder()
            .uri("/hello")
            .body(Bytes::new())
            .unwrap();
        assert!(matches!(request_path(&plain), Cow::Borrowed("/hello")));
    }
}
