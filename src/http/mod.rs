//! HTTP protocol layer module
//!
//! Response sinks, the conditional `ETag` middleware and content delivery,
//! decoupled from the individual echo handlers.

pub mod cache;
pub mod capture;
pub mod conditional;
pub mod mime;
pub mod range;
pub mod response;
pub mod sink;
pub mod transmit;

// Re-export commonly used types
pub use cache::{generate_etag, generate_etag_from_reader, EntityTag, MatchMode, Strength};
pub use capture::ResponseCapture;
pub use conditional::BodyEtag;
pub use response::{
    build_404_response, build_405_response, build_413_response, build_500_response, write_error,
};
pub use sink::{request_path, Handler, Request, ResponseSink, ResponseWriter};
pub use transmit::{serve_content, Delivery};
