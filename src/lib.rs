//! # sprig
//!
//! **sprig** is a small HTTP routing core for Rust, built on the `may`
//! coroutine runtime and `may_minihttp`.
//!
//! ## Overview
//!
//! - A prefix tree ([`router::RouteTrie`]) matches request paths in O(segments)
//!   with literal, `:param` and `*wildcard` segments.
//! - Each path holds a method table ([`router::RouteEntry`]) of compiled,
//!   immutable [`HandlerDescriptor`]s.
//! - A per-request pipeline ([`Server::handle`]) computes an *ability*, checks
//!   the route *guard*, validates query and body, resolves injected
//!   *providers* in order, runs the handler, and renders the result through a
//!   [`Responder`].
//! - Typed errors ([`HttpError`]) map to 400/401/404/405/500 JSON responses.
//!
//! ## Architecture
//!
//! - **[`router`]** - route trie and method tables
//! - **[`handler`]** - route builder, compiled descriptors, handler arguments
//! - **[`inject`]** - ordered providers, lazy injector
//! - **[`dispatcher`]** - the request pipeline and the [`App`] type bundle
//! - **[`server`]** - request/response types, server builder, transport adapter
//! - **[`responder`]** - responders and the top-level error mapper
//! - **[`static_files`]** - sanitised static file serving
//! - **[`validator`]** - serde and JSON Schema validators
//! - **[`runtime_config`]**, **[`otel`]**, **[`cli`]** - configuration, logging, CLI
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use sprig::server::Incoming;
//! use sprig::{App, RouteBuilder, ServerBuilder};
//!
//! struct Tracks;
//! impl App for Tracks {
//!     type Context = ();
//!     type Config = ();
//!     type Ability = bool;
//! }
//!
//! let server = ServerBuilder::<Tracks>::new((), ())
//!     .define_ability(|args| Ok(args.request.auth_token() == Some("s3cret")))
//!     .route(
//!         RouteBuilder::<Tracks>::get("tracks/:id")
//!             .guard(|member| *member)
//!             .handle(|args| Ok(json!({ "id": args.params.get("id") }).into())),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let ok = server.serve(Incoming::new("GET", "/tracks/7").header("Authorization", "Bearer s3cret"));
//! assert_eq!(ok.status, 200);
//! assert_eq!(ok.json().unwrap(), json!({ "id": "7" }));
//!
//! let denied = server.serve(Incoming::new("GET", "/tracks/7"));
//! assert_eq!(denied.status, 401);
//! ```

pub mod cli;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod ids;
pub mod inject;
pub mod otel;
pub mod responder;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod static_files;
pub mod validator;

pub use dispatcher::{AbilityArgs, App, Server};
pub use error::{BuildError, ErrorKind, HttpError};
pub use handler::{HandlerArgs, HandlerDescriptor, Reply, RouteBuilder};
pub use inject::{Injected, Injector, ProviderArgs, Providers};
pub use responder::{JsonResponder, Responder};
pub use server::{HttpResponse, Incoming, Request, ServerBuilder};
pub use static_files::{StaticFileResponder, StaticFiles};
