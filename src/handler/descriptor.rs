use http::{Method, StatusCode};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, Span};

use super::{HandlerArgs, Reply};
use crate::dispatcher::App;
use crate::error::HttpError;
use crate::inject::Providers;
use crate::responder::Responder;
use crate::router::Params;
use crate::server::Request;

pub(crate) type Validator<T> = Arc<dyn Fn(&Value) -> anyhow::Result<T> + Send + Sync>;
pub(crate) type Guard<A> = Arc<dyn Fn(&<A as App>::Ability) -> bool + Send + Sync>;
pub(crate) type Callback<A, Q, B> =
    Arc<dyn Fn(HandlerArgs<'_, A, Q, B>) -> anyhow::Result<Reply> + Send + Sync>;

/// Maps a typed error raised by one route into a custom responder
pub type ErrorHandler = Arc<dyn Fn(&HttpError) -> Box<dyn Responder> + Send + Sync>;

/// Per-call inputs for [`Execute::exec`]
pub(crate) struct Invocation<'a, A: App> {
    pub ctx: &'a A::Context,
    pub params: &'a Params,
    pub request: &'a Request,
    pub ability: A::Ability,
    pub span: &'a Span,
    pub providers: &'a Providers<A>,
    pub inject_keys: &'a [Arc<str>],
    pub config: &'a A::Config,
}

/// Type-erased execution of a compiled route; hides the query and body types.
pub(crate) trait Execute<A: App>: Send + Sync {
    fn exec(&self, call: Invocation<'_, A>) -> anyhow::Result<Reply>;
}

pub(crate) struct Compiled<A: App, Q, B> {
    pub query: Validator<Q>,
    pub body: Validator<B>,
    pub read_body: bool,
    pub callback: Callback<A, Q, B>,
}

impl<A: App, Q, B> Execute<A> for Compiled<A, Q, B> {
    fn exec(&self, call: Invocation<'_, A>) -> anyhow::Result<Reply> {
        let query = (self.query)(call.request.query())
            .map_err(|err| HttpError::bad_request("Invalid Query").with_cause(err))?;

        let body = if self.read_body {
            let raw = call
                .request
                .read_body()
                .map_err(|err| HttpError::bad_request("Invalid Body").with_cause(err))?;
            (self.body)(&raw).map_err(|err| HttpError::bad_request("Invalid Body").with_cause(err))?
        } else {
            (self.body)(&Value::Object(Map::new()))?
        };

        let inject = call
            .providers
            .resolve_all(call.inject_keys, call.request, call.ctx, call.config)?;

        (self.callback)(HandlerArgs {
            ctx: call.ctx,
            params: call.params,
            query,
            body,
            ability: call.ability,
            span: call.span,
            inject,
            request: call.request,
            config: call.config,
        })
    }
}

/// The compiled, immutable form of one route + method.
///
/// Shared between concurrent requests without locking.
pub struct HandlerDescriptor<A: App> {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) exec: Box<dyn Execute<A>>,
    pub(crate) guard: Option<Guard<A>>,
    pub(crate) inject_keys: Vec<Arc<str>>,
    pub(crate) http_code: StatusCode,
    pub(crate) config: Arc<A::Config>,
    pub(crate) error_handler: Option<ErrorHandler>,
}

impl<A: App> HandlerDescriptor<A> {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Status code used when the callback returns a raw value
    #[must_use]
    pub fn http_code(&self) -> StatusCode {
        self.http_code
    }

    #[must_use]
    pub fn inject_keys(&self) -> &[Arc<str>] {
        &self.inject_keys
    }

    #[must_use]
    pub fn config(&self) -> &A::Config {
        &self.config
    }

    #[must_use]
    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    /// `true` when there is no guard or the guard accepts `ability`
    #[must_use]
    pub fn allows(&self, ability: &A::Ability) -> bool {
        self.guard.as_ref().is_none_or(|guard| guard(ability))
    }

    #[must_use]
    pub fn error_handler(&self) -> Option<&ErrorHandler> {
        self.error_handler.as_ref()
    }

    /// Validate query and body, resolve injected providers, then invoke the
    /// callback. Its result is returned unmodified.
    ///
    /// # Errors
    ///
    /// `BadRequest("Invalid Query")`, `BadRequest("Invalid Body")`, provider
    /// failures and callback failures, in that order.
    pub fn exec(
        &self,
        ctx: &A::Context,
        params: &Params,
        request: &Request,
        ability: A::Ability,
        span: &Span,
        providers: &Providers<A>,
    ) -> anyhow::Result<Reply> {
        debug!(method = %self.method, route = %self.path, "Executing handler");
        self.exec.exec(Invocation {
            ctx,
            params,
            request,
            ability,
            span,
            providers,
            inject_keys: &self.inject_keys,
            config: &self.config,
        })
    }
}

impl<A: App> fmt::Debug for HandlerDescriptor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("guard", &self.guard.is_some())
            .field("inject_keys", &self.inject_keys)
            .field("http_code", &self.http_code)
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}
