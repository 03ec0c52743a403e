//! Log writer module
//!
//! Routes access and error lines to files or stdout/stderr. A process-wide
//! writer is installed once by [`init`]; before that, callers fall back to
//! the standard streams.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

impl LogTarget {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        match path {
            Some(p) => Ok(Self::File(Mutex::new(open_log_file(p)?))),
            None => Ok(fallback),
        }
    }

    fn write_line(&self, message: &str) {
        match self {
            Self::Stdout => println!("{message}"),
            Self::Stderr => eprintln!("{message}"),
            Self::File(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{message}");
                }
            }
        }
    }
}

/// Thread-safe pair of access and error log targets
pub struct LogWriter {
    access: LogTarget,
    error: LogTarget,
}

impl LogWriter {
    fn new(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        Ok(Self {
            access: LogTarget::open(access_log_file, LogTarget::Stdout)?,
            error: LogTarget::open(error_log_file, LogTarget::Stderr)?,
        })
    }

    pub fn write_access(&self, message: &str) {
        self.access.write_line(message);
    }

    pub fn write_error(&self, message: &str) {
        self.error.write_line(message);
    }

    /// Informational lines share the access log target
    pub fn write_info(&self, message: &str) {
        self.access.write_line(message);
    }
}

/// Open or create a log file for appending, creating parent directories
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global log writer
///
/// Fails if a log file cannot be opened or a writer is already installed.
pub fn init(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<()> {
    let writer = LogWriter::new(access_log_file, error_log_file)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// The global log writer, if [`init`] has run
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}
