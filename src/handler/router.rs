//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body buffering, route matching,
//! handler dispatch and access logging.

use crate::config::AppState;
use crate::http::{self, Handler, Request, ResponseSink, ResponseWriter};
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{
    HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH, REFERER, SERVER, USER_AGENT,
};
use hyper::{Method, Response, StatusCode};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Method + exact path route table
#[derive(Default)]
pub struct Router {
    routes: BTreeMap<String, Vec<(Method, Arc<dyn Handler>)>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` on `path`; the first registration wins
    pub fn route(&mut self, method: Method, path: &str, handler: Arc<dyn Handler>) {
        let entry = self.routes.entry(path.to_string()).or_default();
        if entry.iter().any(|(m, _)| *m == method) {
            logger::log_warning(&format!("Duplicate route ignored: {method} {path}"));
            return;
        }
        entry.push((method, handler));
    }

    pub fn get(&mut self, path: &str, handler: Arc<dyn Handler>) {
        self.route(Method::GET, path, handler);
    }

    pub fn post(&mut self, path: &str, handler: Arc<dyn Handler>) {
        self.route(Method::POST, path, handler);
    }

    /// Registered `(method, path)` pairs, sorted by path
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .flat_map(|(path, handlers)| {
                handlers
                    .iter()
                    .map(move |(method, _)| (method.clone(), path.clone()))
            })
            .collect()
    }

    /// Run the matching handler; `HEAD` falls back to `GET`
    pub fn dispatch(&self, req: &Request) -> Response<Full<Bytes>> {
        let Some(handlers) = self.routes.get(&*http::request_path(req)) else {
            return http::build_404_response();
        };

        let method = if req.method() == Method::HEAD {
            &Method::GET
        } else {
            req.method()
        };

        if let Some((_, handler)) = handlers.iter().find(|(m, _)| m == method) {
            let mut w = ResponseWriter::new();
            handler.serve(&mut w, req);
            return w.into_response();
        }

        let mut allow: Vec<&str> = handlers.iter().map(|(m, _)| m.as_str()).collect();
        if allow.contains(&"GET") {
            allow.push("HEAD");
        }
        http::build_405_response(&allow.join(", "))
    }
}

/// HTML index of every registered route
pub fn index_page(routes: &[(Method, String)]) -> Arc<dyn Handler> {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n\
         <link rel=\"icon\" type=\"image/svg+xml\" href=\"/favicon.svg\">\n\
         </head>\n<body>\n<ul>\n",
    );
    for (method, path) in routes {
        let escaped = escape_html(path);
        if *method == Method::GET {
            html.push_str(&format!(
                "<li>{method} <a href=\"{escaped}\">{escaped}</a></li>\n"
            ));
        } else {
            html.push_str(&format!("<li>{method} {escaped}</li>\n"));
        }
    }
    html.push_str("</ul>\n</body>\n</html>\n");

    Arc::new(move |w: &mut dyn ResponseSink, _req: &Request| {
        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        let _ = w.write_all(html.as_bytes());
    })
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: hyper::Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let mut entry = state.access_log().then(|| access_entry(&req, remote_addr));

    let mut response = match buffer_request(req, state.config.http.max_body_size).await {
        Ok(req) => {
            let state = Arc::clone(&state);
            // Handlers do blocking I/O; keep them off the reactor threads
            match tokio::task::spawn_blocking(move || state.router.dispatch(&req)).await {
                Ok(resp) => resp,
                Err(e) => {
                    logger::log_error(&format!("Handler task failed: {e}"));
                    http::build_500_response()
                }
            }
        }
        Err(resp) => resp,
    };

    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, name);
    }

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Collect the request body, refusing anything over `max_body_size`
async fn buffer_request<B>(
    req: hyper::Request<B>,
    max_body_size: u64,
) -> Result<Request, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(resp) = check_body_size(&req, max_body_size) {
        return Err(resp);
    }

    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(Request::from_parts(parts, collected.to_bytes())),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!(
                "Request body exceeded {max_body_size} bytes: {} {}",
                parts.method, parts.uri
            ));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Full::new(Bytes::from("400 Bad Request\n")))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new()))))
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &hyper::Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let size = req
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()?;

    if size > max_body_size {
        logger::log_warning(&format!(
            "Request body too large: {size} bytes (max: {max_body_size})"
        ));
        return Some(http::build_413_response());
    }
    None
}

fn access_entry<B>(req: &hyper::Request<B>, remote_addr: SocketAddr) -> AccessLogEntry {
    let header = |name| {
        req.headers()
            .get(name)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = format!("{:?}", req.version())
        .trim_start_matches("HTTP/")
        .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.if_none_match = header(IF_NONE_MATCH);
    entry
}
