//! Conditional response middleware
//!
//! Wraps a handler, hashes whatever it produced and answers `304 Not Modified`
//! when the client already holds the same content.

use crate::http::cache::{self, MatchMode, Strength};
use crate::http::capture::ResponseCapture;
use crate::http::sink::{Handler, Request, ResponseSink};
use crate::logger;
use hyper::header::{
    HeaderValue, CACHE_CONTROL, CONTENT_LOCATION, ETAG, EXPIRES, IF_NONE_MATCH, VARY,
};
use hyper::StatusCode;
use std::sync::Arc;

/// `ETag` middleware around a buffered handler
///
/// Strength and match mode are fixed per instance.
pub struct BodyEtag {
    inner: Arc<dyn Handler>,
    strength: Strength,
    match_mode: MatchMode,
}

impl BodyEtag {
    /// Wrap `inner`, emitting strong validators
    pub fn strong(inner: Arc<dyn Handler>) -> Self {
        Self::new(inner, Strength::Strong)
    }

    /// Wrap `inner`, emitting weak validators
    pub fn weak(inner: Arc<dyn Handler>) -> Self {
        Self::new(inner, Strength::Weak)
    }

    pub fn new(inner: Arc<dyn Handler>, strength: Strength) -> Self {
        Self {
            inner,
            strength,
            match_mode: MatchMode::default(),
        }
    }

    #[must_use]
    pub const fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }
}

impl Handler for BodyEtag {
    fn serve(&self, w: &mut dyn ResponseSink, req: &Request) {
        let mut capture = ResponseCapture::new();
        self.inner.serve(&mut capture, req);

        let etag = cache::generate_etag(capture.body()).with_strength(self.strength);
        let Ok(etag_value) = HeaderValue::from_str(etag.as_str()) else {
            // base64 and quotes are always valid header bytes
            logger::log_error(&format!("Unrepresentable ETag: {etag}"));
            capture.flush_into(w);
            return;
        };

        let if_none_match = req
            .headers()
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok());

        if cache::check_etag_match(if_none_match, &etag, self.match_mode) {
            // A 304 keeps the caching metadata of the full response
            let dst = w.headers_mut();
            for name in [CACHE_CONTROL, CONTENT_LOCATION, EXPIRES, VARY] {
                if let Some(value) = capture.headers().get(&name) {
                    dst.insert(name, value.clone());
                }
            }
            dst.insert(ETAG, etag_value);
            w.write_status(StatusCode::NOT_MODIFIED);
            return;
        }

        capture.headers_mut().insert(ETAG, etag_value);
        capture.flush_into(w);
    }
}
