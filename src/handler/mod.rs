//! # Handler Module
//!
//! Routes are assembled with a [`RouteBuilder`] and compiled into an immutable
//! [`HandlerDescriptor`] when the server is built.
//!
//! Executing a descriptor runs, in order:
//!
//! 1. the query validator (`BadRequest("Invalid Query")` on failure)
//! 2. body read + decode + validator (`BadRequest("Invalid Body")` on failure);
//!    the body is not read at all when no body validator is configured
//! 3. the injected providers, one at a time in declared order
//! 4. the callback, with a [`HandlerArgs`] bundle
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use sprig::{App, RouteBuilder};
//!
//! struct Demo;
//! impl App for Demo {
//!     type Context = ();
//!     type Config = ();
//!     type Ability = ();
//! }
//!
//! let route = RouteBuilder::<Demo>::get("tracks/:id")
//!     .handle(|args| Ok(json!({ "id": args.params.get("id") }).into()));
//! ```

mod builder;
mod descriptor;

pub use builder::RouteBuilder;
pub use descriptor::{ErrorHandler, HandlerDescriptor};

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::Span;

use crate::dispatcher::App;
use crate::inject::Injected;
use crate::responder::Responder;
use crate::router::Params;
use crate::server::Request;

/// What a handler returns.
///
/// A raw value is rendered as JSON with the route's status code; a responder
/// is used as-is.
pub enum Reply {
    Value(Value),
    Responder(Box<dyn Responder>),
}

impl Reply {
    /// Serialise `value` into a raw JSON reply
    ///
    /// # Errors
    ///
    /// When `value` cannot be represented as JSON.
    pub fn json<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Self::Value(serde_json::to_value(value)?))
    }

    pub fn responder(responder: impl Responder + 'static) -> Self {
        Self::Responder(Box::new(responder))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Box<dyn Responder>> for Reply {
    fn from(responder: Box<dyn Responder>) -> Self {
        Self::Responder(responder)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Responder(_) => f.write_str("Responder(..)"),
        }
    }
}

/// Everything a handler callback receives
pub struct HandlerArgs<'a, A: App, Q = Value, B = Value> {
    pub ctx: &'a A::Context,
    pub params: &'a Params,
    /// Validated query (`{}` when the route has no query validator)
    pub query: Q,
    /// Validated body (`{}` when the route has no body validator)
    pub body: B,
    pub ability: A::Ability,
    /// Request span; log through it to keep the request id attached
    pub span: &'a Span,
    pub inject: Injected,
    pub request: &'a Request,
    pub config: &'a A::Config,
}
