//! # Server Module
//!
//! Request and response types, the [`ServerBuilder`], and the
//! `may_minihttp` transport adapter.
//!
//! ```rust,no_run
//! use serde_json::json;
//! use sprig::server::{AppService, HttpServer, ServerBuilder};
//! use sprig::{App, RouteBuilder};
//! use std::sync::Arc;
//!
//! struct Demo;
//! impl App for Demo {
//!     type Context = ();
//!     type Config = ();
//!     type Ability = ();
//! }
//!
//! let server = ServerBuilder::<Demo>::new((), ())
//!     .route(RouteBuilder::<Demo>::get("health").handle(|_| Ok(json!({"status": "ok"}).into())))
//!     .build()?;
//! let handle = HttpServer(AppService::new(Arc::new(server))).start("127.0.0.1:3000")?;
//! handle.join().ok();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod http_server;
mod request;
mod response;
mod service;

pub use builder::ServerBuilder;
pub use http_server::{HttpServer, ServerHandle};
pub use request::{decode_body, decode_form, Incoming, Request};
pub use response::{
    status_reason, write_response, HeaderVec, HttpResponse, ResponseSink, MAX_INLINE_HEADERS,
    MAX_INTERNED_HEADER_LINES,
};
pub use service::AppService;
