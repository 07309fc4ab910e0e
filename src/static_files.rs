//! Static file serving.
//!
//! Paths are resolved lexically against an absolute base directory: `.` is
//! skipped, `..` pops a component, and the result must stay under the base.
//! An escaping path is a `BadRequest` whether or not anything exists there.

use http::StatusCode;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::{ErrorKind, HttpError};
use crate::responder::Responder;
use crate::server::{Request, ResponseSink};

/// MIME type for a file extension, `text/plain` when unknown or missing
#[must_use]
pub fn mime_lookup(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "text/plain",
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn absolute_base(base: &Path) -> Result<PathBuf, HttpError> {
    let base = if base.is_absolute() {
        base.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| HttpError::internal().with_cause(err))?
            .join(base)
    };
    Ok(normalize(&base))
}

/// Resolve `filename` under `base` without touching the filesystem.
///
/// # Errors
///
/// `BadRequest` when the result leaves `base`; `InternalServerError` when a
/// relative base cannot be made absolute.
pub fn resolve_path(base: &Path, filename: &str) -> Result<PathBuf, HttpError> {
    let base = absolute_base(base)?;
    let mut resolved = base.clone();
    for comp in Path::new(filename).components() {
        match comp {
            Component::Normal(part) => resolved.push(part),
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        debug!(filename = %filename, "Static path escapes base directory");
        Err(HttpError::bad_request("Bad Request"))
    }
}

/// Streams one file with a MIME type derived from its extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFileResponder {
    path: PathBuf,
    content_type: &'static str,
    status: StatusCode,
}

impl StaticFileResponder {
    fn for_file(path: PathBuf) -> Result<Self, HttpError> {
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Self {
                content_type: mime_lookup(&path),
                path,
                status: StatusCode::OK,
            }),
            Ok(_) => Err(HttpError::not_found()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(HttpError::not_found()),
            Err(err) => Err(HttpError::internal().with_cause(err)),
        }
    }

    /// Responder for `filename` under `base`.
    ///
    /// # Errors
    ///
    /// `BadRequest` for paths escaping `base`, `NotFound` when the file is
    /// absent, `InternalServerError` for other filesystem failures.
    pub fn from_file_path(base: &Path, filename: &str) -> Result<Self, HttpError> {
        Self::for_file(resolve_path(base, filename)?)
    }

    /// Responder for the request's pathname under `base`, if it names a
    /// regular file there.
    #[must_use]
    pub fn from_request(base: &Path, request: &Request) -> Option<Self> {
        Self::from_file_path(base, request.pathname()).ok()
    }

    /// Responder for a fixed path (e.g. a single-page app's `index.html`).
    ///
    /// # Errors
    ///
    /// `NotFound` when the file is absent.
    pub fn from_default_path(path: impl Into<PathBuf>) -> Result<Self, HttpError> {
        Self::for_file(path.into())
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.content_type
    }
}

impl Responder for StaticFileResponder {
    fn respond(self: Box<Self>, sink: &mut dyn ResponseSink) -> anyhow::Result<()> {
        let mut file = File::open(&self.path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                HttpError::not_found()
            } else {
                HttpError::internal().with_cause(err)
            }
        })?;
        sink.set_status(self.status);
        sink.set_header("Content-Type", self.content_type);
        let written = io::copy(&mut file, sink.body_writer())?;
        debug!(path = %self.path.display(), bytes = written, "Static file sent");
        Ok(())
    }
}

/// A static directory served for unmatched `GET` requests
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
    spa: bool,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
            spa: false,
        }
    }

    /// Serve `index.html` for paths that are not files
    #[must_use]
    pub fn spa(mut self, enabled: bool) -> Self {
        self.spa = enabled;
        self
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Responder for `pathname`, falling back to the index in SPA mode
    #[must_use]
    pub fn lookup(&self, pathname: &str) -> Option<StaticFileResponder> {
        match StaticFileResponder::from_file_path(&self.base_dir, pathname) {
            Ok(responder) => Some(responder),
            Err(err) if self.spa && err.kind() == ErrorKind::NotFound => {
                StaticFileResponder::from_default_path(self.base_dir.join("index.html")).ok()
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_lookup(Path::new("song.mp3")), "audio/mpeg");
        assert_eq!(mime_lookup(Path::new("a/b/cover.JPG")), "image/jpeg");
        assert_eq!(mime_lookup(Path::new("cover.jpeg")), "image/jpeg");
        assert_eq!(mime_lookup(Path::new("index.html")), "text/html");
        assert_eq!(mime_lookup(Path::new("README")), "text/plain");
        assert_eq!(mime_lookup(Path::new("data.unknown")), "text/plain");
    }

    #[test]
    fn test_resolve_path_stays_under_base() {
        let base = Path::new("/srv/www");
        assert_eq!(
            resolve_path(base, "/css/site.css").unwrap(),
            PathBuf::from("/srv/www/css/site.css")
        );
        assert_eq!(
            resolve_path(base, "a/../b/./c.txt").unwrap(),
            PathBuf::from("/srv/www/b/c.txt")
        );
    }

    #[test]
    fn test_resolve_path_rejects_escape() {
        let base = Path::new("/srv/www");
        for bad in ["../etc/passwd", "/a/../../secret", "../www2/x"] {
            let err = resolve_path(base, bad).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{bad}");
        }
    }

    #[test]
    fn test_relative_base_is_made_absolute() {
        let resolved = resolve_path(Path::new("public"), "x.txt").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("public/x.txt"));
    }
}
