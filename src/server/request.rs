use http::Method;
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::response::HeaderVec;
use crate::error::HttpError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::resolve_method;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Raw request as handed over by a transport: method and target exactly as
/// received, header pairs, and a byte source for the body.
pub struct Incoming {
    pub method: String,
    /// Request target: path plus optional `?query`
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn Read + Send>,
}

impl Incoming {
    /// Incoming request with no headers and an empty body
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: Vec::new(),
            body: Box::new(io::empty()),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Read + Send + 'static) -> Self {
        self.body = Box::new(body);
        self
    }

    /// Set a text body (bytes are copied into an in-memory reader)
    #[must_use]
    pub fn text(self, body: impl Into<String>) -> Self {
        self.body(io::Cursor::new(body.into().into_bytes()))
    }
}

impl fmt::Debug for Incoming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incoming")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

enum BodyState {
    Unread(Box<dyn Read + Send>),
    Decoded(Value),
    Failed,
}

/// A parsed request with a supported method.
///
/// The body is not touched until [`Request::read_body`] is called; it is then
/// drained to end-of-stream once and the decoded value is cached.
pub struct Request {
    id: RequestId,
    method: Method,
    pathname: String,
    query: Value,
    headers: HeaderVec,
    body: Mutex<BodyState>,
}

impl Request {
    /// Parse an [`Incoming`] request.
    ///
    /// # Errors
    ///
    /// `BadRequest("Unknown HTTP Method")` when the method is not one of the
    /// supported methods.
    pub fn from_incoming(incoming: Incoming) -> Result<Self, HttpError> {
        let method = resolve_method(&incoming.method)?;

        let target = incoming
            .target
            .split_once('#')
            .map_or(incoming.target.as_str(), |(t, _)| t);
        let (path, query_str) = target.split_once('?').unwrap_or((target, ""));
        let pathname = if path.is_empty() { "/" } else { path };

        let headers: HeaderVec = incoming
            .headers
            .into_iter()
            .map(|(name, value)| (Arc::from(name.to_ascii_lowercase()), value))
            .collect();

        let id = RequestId::from_header_or_new(
            headers
                .iter()
                .find(|(k, _)| k.as_ref() == REQUEST_ID_HEADER)
                .map(|(_, v)| v.as_str()),
        );

        Ok(Self {
            id,
            method,
            pathname: pathname.to_string(),
            query: decode_form(query_str),
            headers,
            body: Mutex::new(BodyState::Unread(incoming.body)),
        })
    }

    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path without query string; `/` when the target had no path
    #[must_use]
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Decoded query mapping. Repeated keys become arrays.
    #[must_use]
    pub fn query(&self) -> &Value {
        &self.query
    }

    /// Headers with lower-cased names
    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Token part of an `Authorization: <scheme> <token>` header
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        let header = self.header("authorization")?;
        let token = header.split(' ').nth(1)?.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Read the body to end-of-stream and decode it according to
    /// `Content-Type`.
    ///
    /// An empty body decodes to `{}`. Form-encoded bodies are decoded like
    /// query strings; anything else is parsed as JSON. The result is cached
    /// so later calls do not touch the stream again.
    ///
    /// # Errors
    ///
    /// I/O failures while draining the stream and JSON syntax errors.
    pub fn read_body(&self) -> anyhow::Result<Value> {
        let mut state = self
            .body
            .lock()
            .map_err(|_| anyhow::anyhow!("request body lock poisoned"))?;

        let reader = match std::mem::replace(&mut *state, BodyState::Failed) {
            BodyState::Decoded(value) => {
                *state = BodyState::Decoded(value.clone());
                return Ok(value);
            }
            BodyState::Failed => anyhow::bail!("request body could not be read"),
            BodyState::Unread(reader) => reader,
        };

        let value = read_and_decode(reader, self.header("content-type"))?;
        *state = BodyState::Decoded(value.clone());
        Ok(value)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("pathname", &self.pathname)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

fn read_and_decode(mut reader: Box<dyn Read + Send>, content_type: Option<&str>) -> anyhow::Result<Value> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let content = String::from_utf8_lossy(&raw);

    debug!(
        content_length = raw.len(),
        content_type = content_type.unwrap_or(""),
        "Request body read"
    );

    decode_body(content_type, &content)
}

/// Decode body text according to a `Content-Type` header value.
///
/// # Errors
///
/// JSON syntax errors for non-form content.
pub fn decode_body(content_type: Option<&str>, content: &str) -> anyhow::Result<Value> {
    if content.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    if media_type.as_deref() == Some(FORM_URLENCODED) {
        return Ok(decode_form(content));
    }
    Ok(serde_json::from_str(content)?)
}

/// Decode `a=1&b=2&b=3` into `{"a": "1", "b": ["2", "3"]}`.
#[must_use]
pub fn decode_form(input: &str) -> Value {
    let mut out = Map::new();
    for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
        let value = Value::String(value.into_owned());
        match out.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                out.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_method_rejected() {
        let err = Request::from_incoming(Incoming::new("OPTIONS", "/")).err();
        assert_eq!(err.map(|e| e.message().to_string()).as_deref(), Some("Unknown HTTP Method"));
    }

    #[test]
    fn test_pathname_and_query() {
        let req = Request::from_incoming(Incoming::new("GET", "/tracks?limit=10&tag=a&tag=b#top")).unwrap();
        assert_eq!(req.pathname(), "/tracks");
        assert_eq!(req.query(), &json!({"limit": "10", "tag": ["a", "b"]}));
    }

    #[test]
    fn test_empty_path_defaults_to_root() {
        let req = Request::from_incoming(Incoming::new("GET", "?x=1")).unwrap();
        assert_eq!(req.pathname(), "/");
    }

    #[test]
    fn test_headers_lowercased() {
        let req = Request::from_incoming(
            Incoming::new("GET", "/").header("Content-Type", "application/json"),
        )
        .unwrap();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_auth_token() {
        let with = |value: &str| {
            Request::from_incoming(Incoming::new("GET", "/").header("Authorization", value)).unwrap()
        };
        assert_eq!(with("Bearer abc123").auth_token(), Some("abc123"));
        assert_eq!(with("Bearer ").auth_token(), None);
        assert_eq!(with("abc123").auth_token(), None);
        let none = Request::from_incoming(Incoming::new("GET", "/")).unwrap();
        assert_eq!(none.auth_token(), None);
    }

    #[test]
    fn test_decode_body_variants() {
        assert_eq!(decode_body(None, "").unwrap(), json!({}));
        assert_eq!(decode_body(Some("application/json"), r#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(decode_body(Some("text/plain"), "[1,2]").unwrap(), json!([1, 2]));
        assert_eq!(
            decode_body(Some("application/x-www-form-urlencoded; charset=utf-8"), "name=a+b&x=%2F").unwrap(),
            json!({"name": "a b", "x": "/"})
        );
        assert!(decode_body(Some("application/json"), "{not json").is_err());
    }

    #[test]
    fn test_body_is_read_once_and_cached() {
        let req = Request::from_incoming(
            Incoming::new("POST", "/").header("content-type", "application/json").text(r#"{"n":1}"#),
        )
        .unwrap();
        assert_eq!(req.read_body().unwrap(), json!({"n": 1}));
        assert_eq!(req.read_body().unwrap(), json!({"n": 1}));
    }

    #[test]
    fn test_failed_body_stays_failed() {
        let req = Request::from_incoming(Incoming::new("POST", "/").text("{oops")).unwrap();
        assert!(req.read_body().is_err());
        assert!(req.read_body().is_err());
    }
}
