//! Echo handlers
//!
//! Small debugging endpoints that reflect the request back to the client.

use crate::http::{Request, ResponseSink};
use crate::logger;
use hyper::header::{HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HOST, SET_COOKIE};
use std::collections::BTreeMap;

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// `GET /hello`
pub fn hello(w: &mut dyn ResponseSink, _req: &Request) {
    w.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT));
    let _ = writeln!(w, "Hello");
}

/// `GET /set-cookie`
pub fn set_cookie(w: &mut dyn ResponseSink, _req: &Request) {
    let headers = w.headers_mut();
    headers.append(
        SET_COOKIE,
        HeaderValue::from_static("HARE-Hello=1; Max-Age=3600"),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    let _ = writeln!(w, "OK");
}

/// `GET /headers`: plain wire format, or JSON when the client asks for it
pub fn headers(w: &mut dyn ResponseSink, req: &Request) {
    let render_json = matches!(
        req.headers().get(ACCEPT).and_then(|v| v.to_str().ok()),
        Some("application/json" | "text/json")
    );

    let dump = collect_headers(req);

    if render_json {
        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match serde_json::to_string_pretty(&dump) {
            Ok(json) => {
                let _ = writeln!(w, "{json}");
            }
            Err(e) => logger::log_error(&format!("Failed to serialize headers: {e}")),
        }
    } else {
        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        for (name, values) in &dump {
            for value in values {
                let _ = write!(w, "{name}: {value}\r\n");
            }
        }
    }
}

/// `POST /body`: the request body, verbatim
pub fn body(w: &mut dyn ResponseSink, req: &Request) {
    let payload = req.body();
    w.headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(payload.len()));

    let result = w.write_all(payload);
    logger::log_info(&format!(
        "/body: {} bytes written, request content-length: {}, err: {:?}",
        payload.len(),
        req.headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-"),
        result.err()
    ));
}

/// Request headers keyed by canonical name, sorted, `Host` excluded
fn collect_headers(req: &Request) -> BTreeMap<String, Vec<String>> {
    let mut dump: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in req.headers() {
        if name == HOST {
            continue;
        }
        dump.entry(canonical_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    dump
}

/// `content-type` -> `Content-Type`
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}
