//! # Router Module
//!
//! Path matching for sprig. Route patterns are registered into a
//! [`RouteTrie`] at startup; each terminal position owns a [`RouteEntry`]
//! mapping HTTP methods to compiled handlers.
//!
//! ## Pattern syntax
//!
//! - `literal` matches verbatim
//! - `:name` matches any single segment and binds it under `name`
//! - `*name` marks its position as a wildcard; the whole request path is
//!   bound under the fixed key `path`
//!
//! Registering the same method twice for a pattern replaces the earlier
//! handler.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use sprig::router::RouteTrie;
//!
//! let mut trie = RouteTrie::new();
//! trie.add_route("tracks").set(Method::GET, "list");
//! trie.add_route("tracks").set(Method::POST, "create");
//!
//! let matched = trie.match_path("/tracks");
//! let entry = matched.entry.expect("registered");
//! assert_eq!(entry.get(&Method::POST), Some(&"create"));
//! ```

mod core;
mod radix;

pub use core::{
    resolve_method, ParamVec, Params, RouteEntry, RouteMatch, MAX_INLINE_PARAMS,
    SUPPORTED_METHODS,
};
pub use radix::{RouteTrie, WILDCARD_KEY};
