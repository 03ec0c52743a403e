//! Response capture module
//!
//! A [`ResponseCapture`] stands in for the real sink while a handler runs.
//! It owns its own status, headers and body; nothing reaches the real sink
//! until [`ResponseCapture::flush_into`] copies everything across in one step.

use crate::logger;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use std::io::{self, Write};

use super::sink::ResponseSink;

/// Buffered response for exactly one request
#[derive(Debug, Default)]
pub struct ResponseCapture {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status written by the handler, if any
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Body bytes accumulated so far
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Copy status, headers and body into `sink`
    ///
    /// Captured headers replace any same-named headers already on the sink.
    /// The status defaults to `200 OK` when the handler never set one.
    /// A failing body write is logged and dropped.
    pub fn flush_into(self, sink: &mut dyn ResponseSink) {
        let dst = sink.headers_mut();
        for name in self.headers.keys() {
            dst.remove(name);
        }
        for (name, value) in &self.headers {
            dst.append(name.clone(), value.clone());
        }

        sink.write_status(self.status.unwrap_or(StatusCode::OK));

        if let Err(e) = sink.write_all(&self.body) {
            logger::log_warning(&format!(
                "Failed to transfer {} captured bytes: {e}",
                self.body.len()
            ));
        }
    }
}

impl ResponseSink for ResponseCapture {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }
}

impl Write for ResponseCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
