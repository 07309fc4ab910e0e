//! # Dispatcher Module
//!
//! The dispatcher runs one request end to end:
//!
//! 1. **Route lookup** in the [`crate::router::RouteTrie`] (fallback route on a miss)
//! 2. **Method lookup** in the matched [`crate::router::RouteEntry`]
//! 3. **Ability** computation with lazy access to providers
//! 4. **Guard** check against the ability
//! 5. **Execution** of the [`crate::handler::HandlerDescriptor`]
//! 6. **Responder** selection, handler-local error mapping
//! 7. **Error mapping** of anything that escapes ([`crate::responder::handle_error`])
//!
//! Method resolution happens earlier, when the transport input is parsed into
//! a [`crate::server::Request`].
//!
//! ## Concurrency
//!
//! Requests run on `may` coroutines. Every stage of one request runs
//! sequentially on its coroutine; blocking I/O parks only that coroutine. The
//! [`Server`] is immutable once built and is shared between coroutines in an
//! `Arc` without locking.

mod core;

pub use core::{AbilityArgs, AbilityFn, Server};

/// Types an application plugs into the server.
///
/// ```rust
/// use sprig::App;
///
/// struct Tracks;
///
/// impl App for Tracks {
///     type Context = ();
///     type Config = ();
///     type Ability = bool;
/// }
/// ```
pub trait App: 'static {
    /// Process-wide value shared by every request
    type Context: Send + Sync + 'static;
    /// Per-server configuration shared by every compiled route
    type Config: Send + Sync + 'static;
    /// Per-request authorization value checked by route guards.
    /// `Default` is used when no ability function is defined.
    type Ability: Default + Send + 'static;
}
