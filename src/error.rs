//! Typed HTTP errors and build-time errors.
//!
//! Request-time failures travel through the pipeline as [`anyhow::Error`].
//! An error that downcasts to [`HttpError`] is *typed*: it carries its own
//! status code and may be intercepted by a handler-local error mapper. Anything
//! else is *unknown* and is always rendered as a 500 by
//! [`crate::responder::handle_error`].
//!
//! | Kind | Code |
//! |---|---|
//! | `BadRequest` | 400 |
//! | `Unauthorized` | 401 |
//! | `NotFound` | 404 |
//! | `MethodNotAllowed` | 405 |
//! | `InternalServerError` | 500 |

use http::{Method, StatusCode};
use serde_json::{Map, Value};
use std::fmt;

/// Boxed error used as the optional cause of an [`HttpError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The closed set of typed error kinds understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl ErrorKind {
    /// Fixed status code for this kind.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message used when the error is raised without one.
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "UnauthorizedError",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::MethodNotAllowed => "Method Not Allowed",
            ErrorKind::InternalServerError => "InternalServerError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::InternalServerError => "InternalServerError",
        };
        f.write_str(name)
    }
}

/// A typed HTTP error: `{kind, code, message, cause?}` plus optional extra
/// fields that are spread into the JSON error body.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<BoxError>,
    fields: Map<String, Value>,
}

impl HttpError {
    /// Create an error of `kind` with an explicit message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            fields: Map::new(),
        }
    }

    /// Create an error of `kind` carrying the kind's default message.
    #[must_use]
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::from_kind(ErrorKind::Unauthorized)
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::from_kind(ErrorKind::NotFound)
    }

    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::from_kind(ErrorKind::MethodNotAllowed)
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::from_kind(ErrorKind::InternalServerError)
    }

    /// Attach the underlying failure. It is reachable through
    /// [`std::error::Error::source`] but never serialised.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach an extra field that is spread into the JSON error body.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// JSON body: extra fields, then `code` and `message` (which win over
    /// extra fields of the same name).
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = self.fields.clone();
        body.insert("code".to_string(), Value::from(self.status().as_u16()));
        body.insert("message".to_string(), Value::String(self.message.clone()));
        Value::Object(body)
    }
}

/// Errors raised while assembling a server. These are start-up contract
/// violations and are fatal.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Route callback not configured for {method} {path}")]
    MissingCallback { method: Method, path: String },

    #[error("Unknown provider `{key}` injected by {method} {path}")]
    UnknownProvider {
        key: String,
        method: Method,
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_status_table() {
        assert_eq!(ErrorKind::BadRequest.status().as_u16(), 400);
        assert_eq!(ErrorKind::Unauthorized.status().as_u16(), 401);
        assert_eq!(ErrorKind::NotFound.status().as_u16(), 404);
        assert_eq!(ErrorKind::MethodNotAllowed.status().as_u16(), 405);
        assert_eq!(ErrorKind::InternalServerError.status().as_u16(), 500);
    }

    #[test]
    fn test_cause_is_source_but_not_serialised() {
        let err = HttpError::bad_request("Invalid Body")
            .with_cause(anyhow::anyhow!("expected value at line 1"));
        assert_eq!(err.to_string(), "Invalid Body");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("expected value at line 1"));
        assert_eq!(err.to_json(), json!({"code": 400, "message": "Invalid Body"}));
    }

    #[test]
    fn test_extra_fields_are_spread() {
        let err = HttpError::not_found().with_field("resource", json!("track"));
        assert_eq!(
            err.to_json(),
            json!({"code": 404, "message": "Not Found", "resource": "track"})
        );
    }

    #[test]
    fn test_downcast_from_anyhow() {
        let err: anyhow::Error = HttpError::unauthorized().into();
        let typed = err.downcast_ref::<HttpError>().map(HttpError::kind);
        assert_eq!(typed, Some(ErrorKind::Unauthorized));
    }
}
