//! # Responder Module
//!
//! A [`Responder`] renders the final response for a request exactly once
//! into a [`ResponseSink`]. Handlers either return a raw JSON value (wrapped
//! in a [`JsonResponder`] with the route's status code) or an explicit
//! responder such as [`crate::static_files::StaticFileResponder`].
//!
//! [`handle_error`] is the top-level error mapper: typed
//! [`crate::error::HttpError`]s keep their own status, anything else becomes a
//! 500 with a `message` body.

mod error_handler;
mod json;

pub use error_handler::{error_response, handle_error};
pub use json::JsonResponder;

use crate::server::ResponseSink;

/// Something that can render itself into the outbound response.
///
/// `respond` consumes the responder, so it runs at most once.
pub trait Responder: Send {
    /// Write status, headers and body into `sink`.
    ///
    /// # Errors
    ///
    /// Any failure while producing the body (e.g. file I/O). The pipeline then
    /// discards whatever was written and renders the error instead.
    fn respond(self: Box<Self>, sink: &mut dyn ResponseSink) -> anyhow::Result<()>;
}
