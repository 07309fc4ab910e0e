use http::StatusCode;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::warn;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage. Names use `Arc<str>` because they are
/// mostly repeated constants (`content-type`, `authorization`, ...).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Where a [`crate::responder::Responder`] renders the outbound response.
///
/// Transports provide an implementation; [`HttpResponse`] is the buffered one
/// used by [`crate::Server::serve`].
pub trait ResponseSink {
    fn set_status(&mut self, status: StatusCode);
    /// Set a header, replacing any header with the same name.
    ///
    /// Over `may_minihttp` every distinct `name: value` line is kept for the
    /// life of the process (see [`write_response`]), at most
    /// [`MAX_INTERNED_HEADER_LINES`] of them; later new lines are dropped.
    /// Keep per-request values (`ETag`, `Location`, ...) out of headers there.
    fn set_header(&mut self, name: &str, value: &str);
    fn body_writer(&mut self) -> &mut dyn io::Write;
}

/// Fully buffered response: status, headers and body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }
}

impl HttpResponse {
    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON
    ///
    /// # Errors
    ///
    /// When the body is not valid JSON.
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }
}

impl ResponseSink for HttpResponse {
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.to_string()));
    }

    fn body_writer(&mut self) -> &mut dyn io::Write {
        &mut self.body
    }
}

/// Reason phrase for a status line
#[must_use]
pub fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// Distinct non-constant header lines kept for the life of the process
pub const MAX_INTERNED_HEADER_LINES: usize = 1024;

/// Copy a buffered response into a `may_minihttp` response.
///
/// `may_minihttp` only accepts `'static` header lines, see
/// [`static_header_line`]. Lines that cannot be interned are dropped with a
/// warning.
pub fn write_response(res: &mut may_minihttp::Response, response: HttpResponse) {
    res.status_code(
        usize::from(response.status.as_u16()),
        status_reason(response.status),
    );
    for (name, value) in &response.headers {
        match static_header_line(name, value) {
            Some(line) => {
                res.header(line);
            }
            None => warn!(header = %name, "Header dropped, interned header limit reached"),
        }
    }
    res.body_vec(response.body);
}

/// Common content types map to constants. Any other line is leaked once and
/// interned, up to [`MAX_INTERNED_HEADER_LINES`] distinct lines.
fn static_header_line(name: &str, value: &str) -> Option<&'static str> {
    static INTERNED: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();

    if name.eq_ignore_ascii_case("content-type") {
        match value {
            "application/json" => return Some("Content-Type: application/json"),
            "text/plain" => return Some("Content-Type: text/plain"),
            "text/html" => return Some("Content-Type: text/html"),
            "text/css" => return Some("Content-Type: text/css"),
            "application/javascript" => return Some("Content-Type: application/javascript"),
            _ => {}
        }
    }

    let mut interned = INTERNED
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    intern_line(&mut interned, format!("{name}: {value}"), MAX_INTERNED_HEADER_LINES)
}

fn intern_line(interned: &mut HashSet<&'static str>, line: String, limit: usize) -> Option<&'static str> {
    if let Some(existing) = interned.get(line.as_str()) {
        return Some(existing);
    }
    if interned.len() >= limit {
        return None;
    }
    let leaked: &'static str = Box::leak(line.into_boxed_str());
    interned.insert(leaked);
    Some(leaked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(StatusCode::OK), "OK");
        assert_eq!(status_reason(StatusCode::METHOD_NOT_ALLOWED), "Method Not Allowed");
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut res = HttpResponse::default();
        res.set_header("Content-Type", "text/plain");
        res.set_header("content-type", "application/json");
        assert_eq!(res.headers.len(), 1);
        assert_eq!(res.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_static_header_line_constants() {
        assert_eq!(
            static_header_line("content-type", "application/json"),
            Some("Content-Type: application/json")
        );
        assert_eq!(static_header_line("x-trace", "abc"), Some("x-trace: abc"));
        let first = static_header_line("content-type", "image/png").unwrap();
        let second = static_header_line("content-type", "image/png").unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_interning_is_bounded() {
        let mut interned = HashSet::new();
        assert_eq!(intern_line(&mut interned, "ETag: a".into(), 2), Some("ETag: a"));
        assert_eq!(intern_line(&mut interned, "ETag: b".into(), 2), Some("ETag: b"));
        assert_eq!(intern_line(&mut interned, "ETag: c".into(), 2), None);
        // Already interned lines stay available at the limit
        assert_eq!(intern_line(&mut interned, "ETag: a".into(), 2), Some("ETag: a"));
        assert_eq!(interned.len(), 2);
    }
}
