//! Logger module
//!
//! Lifecycle, access, error and warning lines. Access and info lines go to
//! the access target, errors and warnings to the error target; either may be
//! a file configured under `logging`.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Destination stream of a log line
#[derive(Clone, Copy)]
enum Stream {
    Info,
    Error,
    Access,
}

/// Route a line to the installed writer, or to stdout/stderr before `init`
fn emit(stream: Stream, message: &str) {
    match (writer::get(), stream) {
        (Some(w), Stream::Info) => w.write_info(message),
        (Some(w), Stream::Error) => w.write_error(message),
        (Some(w), Stream::Access) => w.write_access(message),
        (None, Stream::Error) => eprintln!("{message}"),
        (None, Stream::Info | Stream::Access) => println!("{message}"),
    }
}

fn write_info(message: &str) {
    emit(Stream::Info, message);
}

fn write_error(message: &str) {
    emit(Stream::Error, message);
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("hare debug server started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    write_info(&format!("ETag match mode: {:?}", config.etag.match_mode));
    match config.assets.dir.as_deref() {
        Some(dir) => write_info(&format!("Assets: {dir}")),
        None => write_info("Assets: embedded"),
    }
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    emit(Stream::Access, &entry.format(format));
}

pub fn log_shutdown(active: usize) {
    write_info(&format!(
        "\n[Shutdown] Signal received, waiting for {active} connection(s)"
    ));
}
