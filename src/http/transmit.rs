//! Content delivery module
//!
//! Serves a seekable byte stream with the usual HTTP/1.1 conveniences:
//! Content-Type inference, `Last-Modified`, precondition checks against the
//! `ETag` already on the response and the modification time, single byte
//! ranges and `HEAD`.

use crate::http::cache;
use crate::http::mime;
use crate::http::range::{self, ByteRange, RangeParseResult};
use crate::http::sink::{Request, ResponseSink};
use hyper::header::{
    HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG,
    IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE, LAST_MODIFIED, RANGE,
};
use hyper::{Method, StatusCode};
use std::io::{self, Read, Seek, SeekFrom};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Outcome of a delivery, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status: StatusCode,
    pub body_bytes: u64,
}

/// Serve `content` as the response to `req`
///
/// `content` may be positioned anywhere; it is measured and rewound first.
/// All reads happen before the response head is written, so an `Err` leaves
/// the sink untouched and the caller may still answer with an error status.
pub fn serve_content<R>(
    w: &mut dyn ResponseSink,
    req: &Request,
    name: &str,
    modified: SystemTime,
    mut content: R,
) -> io::Result<Delivery>
where
    R: Read + Seek,
{
    let size = content.seek(SeekFrom::End(0))?;
    content.seek(SeekFrom::Start(0))?;

    let last_modified = httpdate::fmt_http_date(modified);

    if is_not_modified(w, req, modified) {
        let headers = w.headers_mut();
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        set_header(headers, LAST_MODIFIED, &last_modified);
        w.write_status(StatusCode::NOT_MODIFIED);
        return Ok(Delivery {
            status: StatusCode::NOT_MODIFIED,
            body_bytes: 0,
        });
    }

    let range_header = req
        .headers()
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .filter(|_| if_range_allows(w, req, &last_modified));

    let (status, selected) = match range::parse_range_header(range_header, size) {
        RangeParseResult::Valid(r) => (StatusCode::PARTIAL_CONTENT, r),
        RangeParseResult::NotSatisfiable => {
            let headers = w.headers_mut();
            set_header(headers, CONTENT_RANGE, &format!("bytes */{size}"));
            headers.remove(CONTENT_LENGTH);
            w.write_status(StatusCode::RANGE_NOT_SATISFIABLE);
            return Ok(Delivery {
                status: StatusCode::RANGE_NOT_SATISFIABLE,
                body_bytes: 0,
            });
        }
        RangeParseResult::None => (
            StatusCode::OK,
            ByteRange {
                start: 0,
                end: size.saturating_sub(1),
            },
        ),
    };
    let length = if size == 0 { 0 } else { selected.len() };

    let is_head = req.method() == Method::HEAD;
    let body = if is_head {
        Vec::new()
    } else {
        read_range(&mut content, selected.start, length)?
    };

    let headers = w.headers_mut();
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(mime::content_type_for(name)),
        );
    }
    set_header(headers, LAST_MODIFIED, &last_modified);
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    if status == StatusCode::PARTIAL_CONTENT {
        set_header(headers, CONTENT_RANGE, &selected.content_range(size));
    }

    w.write_status(status);
    if !body.is_empty() {
        // Disconnects surface here; delivery is best effort
        w.write_all(&body)?;
    }

    Ok(Delivery {
        status,
        body_bytes: body.len() as u64,
    })
}

/// Read `length` bytes starting at `start`
fn read_range<R: Read + Seek>(content: &mut R, start: u64, length: u64) -> io::Result<Vec<u8>> {
    content.seek(SeekFrom::Start(start))?;
    let mut body = Vec::with_capacity(usize::try_from(length).unwrap_or_default());
    content.take(length).read_to_end(&mut body)?;
    if (body.len() as u64) < length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("content ended after {} of {length} bytes", body.len()),
        ));
    }
    Ok(body)
}

/// `If-None-Match` decides when present; `If-Modified-Since` only otherwise
fn is_not_modified(w: &dyn ResponseSink, req: &Request, modified: SystemTime) -> bool {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return false;
    }

    if let Some(inm) = req.headers().get(IF_NONE_MATCH) {
        let etag = w.headers().get(ETAG).and_then(|v| v.to_str().ok());
        return match (inm.to_str().ok(), etag) {
            (Some(inm), Some(etag)) => cache::check_weak_match(inm, etag),
            _ => false,
        };
    }

    let Some(since) = req
        .headers()
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
    else {
        return false;
    };

    truncate_to_seconds(modified) <= since
}

/// A Range is honored unless `If-Range` names a different representation
fn if_range_allows(w: &dyn ResponseSink, req: &Request, last_modified: &str) -> bool {
    let Some(if_range) = req.headers().get(IF_RANGE).and_then(|v| v.to_str().ok()) else {
        return true;
    };

    if if_range.starts_with('"') {
        // Strong comparison only
        return w
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|etag| etag == if_range);
    }

    if_range == last_modified
}

/// HTTP dates carry whole seconds only
fn truncate_to_seconds(t: SystemTime) -> SystemTime {
    t.duration_since(UNIX_EPOCH)
        .map_or(t, |d| UNIX_EPOCH + Duration::from_secs(d.as_secs()))
}

fn set_header(headers: &mut hyper::HeaderMap, name: hyper::header::HeaderName, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(name, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::sink::ResponseWriter;
    use hyper::body::Bytes;
    use std::io::Cursor;

    const DATA: &[u8] = b"0123456789abcdef";

    fn modified() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn request(method: Method, headers: &[(&str, &str)]) -> Request {
        let mut builder = hyper::Request::builder().method(method).uri("/data.txt");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Bytes::new()).unwrap()
    }

    fn serve(req: &Request, etag: Option<&'static str>) -> (ResponseWriter, Delivery) {
        let mut w = ResponseWriter::new();
        if let Some(tag) = etag {
            w.headers_mut().insert(ETAG, HeaderValue::from_static(tag));
        }
        let delivery = serve_content(&mut w, req, "/data.txt", modified(), Cursor::new(DATA)).unwrap();
        (w, delivery)
    }

    #[test]
    fn test_full_delivery() {
        let (w, delivery) = serve(&request(Method::GET, &[]), None);
        assert_eq!(delivery.status, StatusCode::OK);
        assert_eq!(w.body(), DATA);
        let resp = w.into_response();
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(resp.headers()[CONTENT_LENGTH], "16");
        assert_eq!(resp.headers()[ACCEPT_RANGES], "bytes");
        assert_eq!(
            resp.headers()[LAST_MODIFIED],
            httpdate::fmt_http_date(modified()).as_str()
        );
    }

    #[test]
    fn test_stream_rewound_before_delivery() {
        let mut cursor = Cursor::new(DATA);
        cursor.set_position(10);
        let mut w = ResponseWriter::new();
        serve_content(&mut w, &request(Method::GET, &[]), "x.bin", modified(), cursor).unwrap();
        assert_eq!(w.body(), DATA);
    }

    #[test]
    fn test_head_has_length_but_no_body() {
        let (w, _) = serve(&request(Method::HEAD, &[]), None);
        assert!(w.body().is_empty());
        assert_eq!(w.into_response().headers()[CONTENT_LENGTH], "16");
    }

    #[test]
    fn test_range_request() {
        let (w, delivery) = serve(&request(Method::GET, &[("range", "bytes=2-5")]), None);
        assert_eq!(delivery.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(w.body(), b"2345");
        let resp = w.into_response();
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 2-5/16");
        assert_eq!(resp.headers()[CONTENT_LENGTH], "4");
    }

    #[test]
    fn test_unsatisfiable_range() {
        let (w, delivery) = serve(&request(Method::GET, &[("range", "bytes=100-")]), None);
        assert_eq!(delivery.status, StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(w.into_response().headers()[CONTENT_RANGE], "bytes */16");
    }

    #[test]
    fn test_if_none_match_uses_etag_header() {
        let req = request(Method::GET, &[("if-none-match", "\"abc\"")]);
        let (w, delivery) = serve(&req, Some("\"abc\""));
        assert_eq!(delivery.status, StatusCode::NOT_MODIFIED);
        assert!(w.body().is_empty());
        let resp = w.into_response();
        assert_eq!(resp.headers()[ETAG], "\"abc\"");
        assert!(resp.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_if_none_match_mismatch_ignores_modified_since() {
        let since = httpdate::fmt_http_date(modified());
        let req = request(
            Method::GET,
            &[("if-none-match", "\"old\""), ("if-modified-since", since.as_str())],
        );
        let (_, delivery) = serve(&req, Some("\"abc\""));
        assert_eq!(delivery.status, StatusCode::OK);
    }

    #[test]
    fn test_if_modified_since() {
        let same = httpdate::fmt_http_date(modified());
        let (_, delivery) = serve(&request(Method::GET, &[("if-modified-since", same.as_str())]), None);
        assert_eq!(delivery.status, StatusCode::NOT_MODIFIED);

        let earlier = httpdate::fmt_http_date(modified() - Duration::from_secs(60));
        let (_, delivery) = serve(
            &request(Method::GET, &[("if-modified-since", earlier.as_str())]),
            None,
        );
        assert_eq!(delivery.status, StatusCode::OK);
    }

    #[test]
    fn test_if_range_mismatch_sends_full_content() {
        let req = request(
            Method::GET,
            &[("range", "bytes=0-1"), ("if-range", "\"other\"")],
        );
        let (w, delivery) = serve(&req, Some("\"abc\""));
        assert_eq!(delivery.status, StatusCode::OK);
        assert_eq!(w.body(), DATA);
    }

    #[test]
    fn test_empty_content() {
        let mut w = ResponseWriter::new();
        let delivery = serve_content(
            &mut w,
            &request(Method::GET, &[]),
            "empty.txt",
            modified(),
            Cursor::new(Vec::new()),
        )
        .unwrap();
        assert_eq!(delivery.status, StatusCode::OK);
        assert_eq!(w.into_response().headers()[CONTENT_LENGTH], "0");
    }
}
