use http::{Method, StatusCode};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::descriptor::{Callback, Compiled, ErrorHandler, Guard, Validator};
use super::{HandlerArgs, HandlerDescriptor, Reply};
use crate::dispatcher::App;
use crate::error::{BuildError, HttpError};
use crate::responder::Responder;

fn empty_object(_: &Value) -> anyhow::Result<Value> {
    Ok(Value::Object(Map::new()))
}

/// Plain mutable builder for one route.
///
/// `Q` and `B` are the types produced by the query and body validators.
/// Attaching a validator changes the type, which discards any callback set
/// so far; call [`RouteBuilder::handle`] last.
pub struct RouteBuilder<A: App, Q = Value, B = Value> {
    method: Method,
    path: String,
    query: Validator<Q>,
    body: Validator<B>,
    read_body: bool,
    guard: Option<Guard<A>>,
    inject: Vec<Arc<str>>,
    http_code: Option<StatusCode>,
    error_handler: Option<ErrorHandler>,
    callback: Option<Callback<A, Q, B>>,
}

impl<A: App> RouteBuilder<A> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Arc::new(empty_object),
            body: Arc::new(empty_object),
            read_body: false,
            guard: None,
            inject: Vec::new(),
            http_code: None,
            error_handler: None,
            callback: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }
}

impl<A: App, Q: 'static, B: 'static> RouteBuilder<A, Q, B> {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn warn_dropped_callback(&self, stage: &str) {
        if self.callback.is_some() {
            warn!(method = %self.method, path = %self.path, stage, "Callback discarded by validator change");
        }
    }

    /// Validate the decoded query mapping. Failures become
    /// `BadRequest("Invalid Query")`.
    pub fn query<T, F>(self, validate: F) -> RouteBuilder<A, T, B>
    where
        T: 'static,
        F: Fn(&Value) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.warn_dropped_callback("query");
        RouteBuilder {
            method: self.method,
            path: self.path,
            query: Arc::new(validate),
            body: self.body,
            read_body: self.read_body,
            guard: self.guard,
            inject: self.inject,
            http_code: self.http_code,
            error_handler: self.error_handler,
            callback: None,
        }
    }

    /// Read, decode and validate the request body. Failures become
    /// `BadRequest("Invalid Body")`.
    pub fn body<T, F>(self, validate: F) -> RouteBuilder<A, Q, T>
    where
        T: 'static,
        F: Fn(&Value) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.warn_dropped_callback("body");
        RouteBuilder {
            method: self.method,
            path: self.path,
            query: self.query,
            body: Arc::new(validate),
            read_body: true,
            guard: self.guard,
            inject: self.inject,
            http_code: self.http_code,
            error_handler: self.error_handler,
            callback: None,
        }
    }

    /// Reject requests whose ability fails `guard` with `Unauthorized`
    #[must_use]
    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&A::Ability) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Resolve the provider `key` before the callback runs
    #[must_use]
    pub fn inject(mut self, key: &str) -> Self {
        self.inject.push(Arc::from(key));
        self
    }

    /// Status for raw-value replies (default 201 for POST, 200 otherwise)
    #[must_use]
    pub fn http_code(mut self, status: StatusCode) -> Self {
        self.http_code = Some(status);
        self
    }

    /// Render typed errors from this route with a custom responder
    #[must_use]
    pub fn error<F>(mut self, map: F) -> Self
    where
        F: Fn(&HttpError) -> Box<dyn Responder> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(map));
        self
    }

    #[must_use]
    pub fn handle<F>(mut self, callback: F) -> Self
    where
        F: Fn(HandlerArgs<'_, A, Q, B>) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Injected keys declared so far
    #[must_use]
    pub fn inject_keys(&self) -> &[Arc<str>] {
        &self.inject
    }

    /// Freeze the route into a [`HandlerDescriptor`].
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingCallback`] if [`RouteBuilder::handle`] was never
    /// called.
    pub fn compile(self, config: Arc<A::Config>) -> Result<HandlerDescriptor<A>, BuildError> {
        let callback = self.callback.ok_or_else(|| BuildError::MissingCallback {
            method: self.method.clone(),
            path: self.path.clone(),
        })?;

        let http_code = self.http_code.unwrap_or(if self.method == Method::POST {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        });

        Ok(HandlerDescriptor {
            method: self.method,
            path: self.path,
            exec: Box::new(Compiled {
                query: self.query,
                body: self.body,
                read_body: self.read_body,
                callback,
            }),
            guard: self.guard,
            inject_keys: self.inject,
            http_code,
            config,
            error_handler: self.error_handler,
        })
    }
}

impl<A: App, Q, B> fmt::Debug for RouteBuilder<A, Q, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("read_body", &self.read_body)
            .field("inject", &self.inject)
            .field("callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestApp;

    impl App for TestApp {
        type Context = ();
        type Config = ();
        type Ability = ();
    }

    #[test]
    fn test_missing_callback() {
        let err = RouteBuilder::<TestApp>::get("tracks").compile(Arc::new(())).unwrap_err();
        assert_eq!(err.to_string(), "Route callback not configured for GET tracks");
    }

    #[test]
    fn test_default_status_codes() {
        let post = RouteBuilder::<TestApp>::post("tracks")
            .handle(|_| Ok(json!({}).into()))
            .compile(Arc::new(()))
            .unwrap();
        assert_eq!(post.http_code(), StatusCode::CREATED);

        let get = RouteBuilder::<TestApp>::get("tracks")
            .handle(|_| Ok(json!({}).into()))
            .compile(Arc::new(()))
            .unwrap();
        assert_eq!(get.http_code(), StatusCode::OK);

        let custom = RouteBuilder::<TestApp>::post("tracks")
            .http_code(StatusCode::ACCEPTED)
            .handle(|_| Ok(json!({}).into()))
            .compile(Arc::new(()))
            .unwrap();
        assert_eq!(custom.http_code(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_validator_change_discards_callback() {
        let route = RouteBuilder::<TestApp>::post("tracks")
            .handle(|_| Ok(json!({}).into()))
            .body(|v| Ok(v.clone()));
        assert!(route.compile(Arc::new(())).is_err());
    }

    #[test]
    fn test_inject_keys_keep_order() {
        let route = RouteBuilder::<TestApp>::get("x").inject("db").inject("user").inject("db");
        let keys: Vec<&str> = route.inject_keys().iter().map(AsRef::as_ref).collect();
        assert_eq!(keys, vec!["db", "user", "db"]);
    }
}
