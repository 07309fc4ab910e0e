//! Router core types: method tables, bound parameters and match results.

use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::HttpError;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the route tree (known
/// at startup); values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// HTTP methods a route can be registered for.
pub const SUPPORTED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
];

/// Resolve a raw request method into one of the [`SUPPORTED_METHODS`].
///
/// # Errors
///
/// `BadRequest("Unknown HTTP Method")` for anything else.
pub fn resolve_method(raw: &str) -> Result<Method, HttpError> {
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str() == raw)
        .cloned()
        .ok_or_else(|| HttpError::bad_request("Unknown HTTP Method"))
}

/// Path parameters bound by a match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(ParamVec);

impl Params {
    /// Get a parameter by name.
    ///
    /// Uses "last write wins" semantics if a name is bound twice
    /// (e.g. `/org/:id/user/:id` returns the user id).
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Convert to a `HashMap`.
    /// Note: This allocates - use [`Params::get`] in hot paths
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

impl From<ParamVec> for Params {
    fn from(value: ParamVec) -> Self {
        Self(value)
    }
}

/// Per-path table mapping an HTTP method to its compiled handler
#[derive(Debug, Clone)]
pub struct RouteEntry<T> {
    handlers: HashMap<Method, T>,
}

impl<T> Default for RouteEntry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteEntry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `method`, returning the handler it replaced.
    pub fn set(&mut self, method: Method, handler: T) -> Option<T> {
        self.handlers.insert(method, handler)
    }

    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&T> {
        self.handlers.get(method)
    }

    /// Methods registered on this path
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.handlers.keys()
    }
}

/// Result of matching a request path against the trie
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// Method table of the matched terminal node, `None` on a miss
    pub entry: Option<&'a RouteEntry<T>>,
    /// Bound path parameters
    pub params: Params,
}
