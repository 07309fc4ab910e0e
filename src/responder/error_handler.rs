use http::StatusCode;
use serde_json::json;
use tracing::error;

use super::{JsonResponder, Responder};
use crate::error::HttpError;
use crate::server::{HttpResponse, ResponseSink};

/// Map any error escaping the pipeline to a JSON response on `sink`.
///
/// Typed errors use their own status and body ([`HttpError::to_json`]);
/// anything else is a 500 with `{"message": <error>}`. Stack traces and
/// causes are never serialised.
pub fn handle_error(err: &anyhow::Error, sink: &mut dyn ResponseSink) {
    let responder = match err.downcast_ref::<HttpError>() {
        Some(http) => {
            error!(status = http.status().as_u16(), kind = %http.kind(), "{}", http.message());
            JsonResponder::with_status(http.to_json(), http.status())
        }
        None => {
            let message = err.to_string();
            error!(status = 500, error = ?err, "{message}");
            JsonResponder::with_status(json!({ "message": message }), StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    if let Err(render_err) = Box::new(responder).respond(sink) {
        // Only reachable if the sink itself fails
        error!(error = %render_err, "Failed to render error response");
    }
}

/// Buffered variant of [`handle_error`]
#[must_use]
pub fn error_response(err: &anyhow::Error) -> HttpResponse {
    let mut response = HttpResponse::default();
    handle_error(err, &mut response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_error_keeps_status() {
        let err: anyhow::Error = HttpError::method_not_allowed().into();
        let res = error_response(&err);
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(
            res.json().unwrap(),
            json!({"code": 405, "message": "Method Not Allowed"})
        );
    }

    #[test]
    fn test_unknown_error_is_500_with_message_only() {
        let err = anyhow::anyhow!("database unavailable");
        let res = error_response(&err);
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.json().unwrap(), json!({"message": "database unavailable"}));
    }

    #[test]
    fn test_context_wrapped_http_error_is_still_typed() {
        let err = anyhow::Error::from(HttpError::not_found()).context("loading track");
        let res = error_response(&err);
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}
