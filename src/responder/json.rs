use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::Responder;
use crate::server::ResponseSink;

/// Serialises a JSON payload with `Content-Type: application/json`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponder {
    pub payload: Value,
    pub status: StatusCode,
}

impl JsonResponder {
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self::with_status(payload, StatusCode::OK)
    }

    #[must_use]
    pub fn with_status(payload: Value, status: StatusCode) -> Self {
        Self { payload, status }
    }

    /// Serialise any `Serialize` value into a responder.
    ///
    /// # Errors
    ///
    /// When `value` cannot be represented as JSON.
    pub fn from_serialize<T: Serialize>(value: &T, status: StatusCode) -> serde_json::Result<Self> {
        Ok(Self::with_status(serde_json::to_value(value)?, status))
    }
}

impl Responder for JsonResponder {
    fn respond(self: Box<Self>, sink: &mut dyn ResponseSink) -> anyhow::Result<()> {
        let body = serde_json::to_vec(&self.payload)?;
        sink.set_header("Content-Type", "application/json");
        sink.set_status(self.status);
        sink.body_writer().write_all(&body)?;
        Ok(())
    }
}
