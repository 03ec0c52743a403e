//! hare: an HTTP debug server
//!
//! Small diagnostic endpoints (header and body echo, cookies, an ASCII
//! table, static assets) behind a content-derived `ETag` layer that answers
//! matching `If-None-Match` requests with `304 Not Modified`.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
