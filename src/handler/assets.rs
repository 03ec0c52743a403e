//! Static asset serving module
//!
//! Assets come from an [`AssetProvider`] as seekable streams. Each request
//! digests the stream for its `ETag`, rewinds it and hands it to the content
//! transmitter together with the process-wide [`AssetClock`].

use crate::http::{self, Delivery, Handler, Request, ResponseSink};
use crate::logger;
use hyper::header::{HeaderValue, ETAG};
use hyper::StatusCode;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Assets compiled into the binary
const EMBEDDED: &[(&str, &[u8])] = &[
    ("/favicon.svg", include_bytes!("../../static/favicon.svg")),
    ("/robots.txt", include_bytes!("../../static/robots.txt")),
];

/// A readable, seekable asset stream
pub trait AssetStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> AssetStream for T {}

/// Source of static assets keyed by logical path (`/favicon.svg`)
pub trait AssetProvider: Send + Sync {
    fn open(&self, name: &str) -> Result<Box<dyn AssetStream>, AssetError>;

    /// Logical paths of every asset, sorted
    fn list(&self) -> Vec<String>;
}

/// Asset serving failures, all local to one request
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("failed to open asset '{name}': {source}")]
    Open { name: String, source: io::Error },
    #[error("failed to digest asset '{name}': {source}")]
    Digest { name: String, source: io::Error },
    #[error("failed to rewind asset '{name}': {source}")]
    Seek { name: String, source: io::Error },
    #[error("failed to deliver asset '{name}': {source}")]
    Deliver { name: String, source: io::Error },
}

impl AssetError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Modification time reported for every asset
///
/// Assets carry no trustworthy mtime of their own, so one timestamp is taken
/// at startup and used for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetClock {
    modified: SystemTime,
}

impl AssetClock {
    /// Capture the current time, truncated to whole seconds
    pub fn startup() -> Self {
        let now = SystemTime::now();
        let modified = now
            .duration_since(UNIX_EPOCH)
            .map_or(now, |d| UNIX_EPOCH + Duration::from_secs(d.as_secs()));
        Self { modified }
    }

    pub const fn fixed(modified: SystemTime) -> Self {
        Self { modified }
    }

    pub const fn modified(&self) -> SystemTime {
        self.modified
    }
}

/// Assets embedded at compile time
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedAssets;

impl AssetProvider for EmbeddedAssets {
    fn open(&self, name: &str) -> Result<Box<dyn AssetStream>, AssetError> {
        EMBEDDED
            .iter()
            .find(|(path, _)| *path == name)
            .map(|(_, data)| Box::new(Cursor::new(*data)) as Box<dyn AssetStream>)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }

    fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = EMBEDDED.iter().map(|(p, _)| (*p).to_string()).collect();
        names.sort();
        names
    }
}

/// Assets read from a directory on disk
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    /// Use `root` as the asset directory; it must exist
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        let relative = name.trim_start_matches('/');
        let candidate = self.root.join(relative);

        // File not found is common (404), no need to log at warning level
        let Ok(canonical) = candidate.canonicalize() else {
            return Err(AssetError::NotFound(name.to_string()));
        };
        if !canonical.starts_with(&self.root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {} -> {}",
                name,
                canonical.display()
            ));
            return Err(AssetError::NotFound(name.to_string()));
        }
        if !canonical.is_file() {
            return Err(AssetError::NotFound(name.to_string()));
        }
        Ok(canonical)
    }
}

impl AssetProvider for DirAssets {
    fn open(&self, name: &str) -> Result<Box<dyn AssetStream>, AssetError> {
        let path = self.resolve(name)?;
        let file = File::open(&path).map_err(|source| AssetError::Open {
            name: name.to_string(),
            source,
        })?;
        Ok(Box::new(file))
    }

    fn list(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_files(&self.root, &self.root, &mut names);
        names.sort();
        names
    }
}

/// Walk `dir`, recording files as `/`-rooted paths relative to `root`
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            logger::log_warning(&format!(
                "Skipping unreadable asset directory '{}': {e}",
                dir.display()
            ));
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(format!("/{}", parts.join("/")));
        }
    }
}

/// Handler serving assets by request path
pub struct StaticAssets {
    provider: Arc<dyn AssetProvider>,
    clock: AssetClock,
}

impl StaticAssets {
    pub fn new(provider: Arc<dyn AssetProvider>, clock: AssetClock) -> Self {
        Self { provider, clock }
    }

    pub fn names(&self) -> Vec<String> {
        self.provider.list()
    }

    /// Validate and deliver one asset
    ///
    /// The stream is digested in full, rewound, and only then delivered, so
    /// a failure before delivery leaves `w` free for an error response.
    pub fn serve_asset(
        &self,
        w: &mut dyn ResponseSink,
        req: &Request,
        name: &str,
    ) -> Result<Delivery, AssetError> {
        let mut stream = self.provider.open(name)?;

        let etag = http::generate_etag_from_reader(&mut stream).map_err(|source| {
            AssetError::Digest {
                name: name.to_string(),
                source,
            }
        })?;

        stream
            .seek(SeekFrom::Start(0))
            .map_err(|source| AssetError::Seek {
                name: name.to_string(),
                source,
            })?;

        if let Ok(value) = HeaderValue::from_str(etag.as_str()) {
            w.headers_mut().insert(ETAG, value);
        }

        http::serve_content(w, req, name, self.clock.modified(), stream).map_err(|source| {
            AssetError::Deliver {
                name: name.to_string(),
                source,
            }
        })
    }
}

impl Handler for StaticAssets {
    fn serve(&self, w: &mut dyn ResponseSink, req: &Request) {
        let name = http::request_path(req);
        if let Err(e) = self.serve_asset(w, req, &name) {
            if !matches!(e, AssetError::NotFound(_)) {
                logger::log_error(&e.to_string());
            }
            http::write_error(w, e.status(), &e.to_string());
        }
    }
}
