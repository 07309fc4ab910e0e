//! Dispatcher core - the per-request pipeline.

use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, Span};

use super::App;
use crate::error::HttpError;
use crate::handler::{HandlerDescriptor, Reply};
use crate::inject::{Injector, Providers};
use crate::responder::{error_response, JsonResponder, Responder};
use crate::router::RouteTrie;
use crate::server::{HttpResponse, Incoming, Request};

/// Arguments handed to the ability function
pub struct AbilityArgs<'r, A: App> {
    pub request: &'r Request,
    pub ctx: &'r A::Context,
    pub config: &'r A::Config,
    /// Providers are only resolved if the ability function asks for them
    pub injector: Injector<'r, A>,
}

/// Computes the per-request [`App::Ability`]
pub type AbilityFn<A> =
    Arc<dyn Fn(AbilityArgs<'_, A>) -> anyhow::Result<<A as App>::Ability> + Send + Sync>;

/// A built server: route tree, compiled handlers and shared state.
///
/// Created by [`crate::server::ServerBuilder::build`] and read-only afterwards.
pub struct Server<A: App> {
    pub(crate) trie: RouteTrie<Arc<HandlerDescriptor<A>>>,
    pub(crate) fallback: Option<Arc<HandlerDescriptor<A>>>,
    pub(crate) context: Arc<A::Context>,
    pub(crate) config: Arc<A::Config>,
    pub(crate) providers: Providers<A>,
    pub(crate) ability: Option<AbilityFn<A>>,
    pub(crate) routes: Vec<(Method, String)>,
}

impl<A: App> fmt::Debug for Server<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("routes", &self.routes)
            .field("fallback", &self.fallback.is_some())
            .field("providers", &self.providers)
            .field("ability", &self.ability.is_some())
            .finish_non_exhaustive()
    }
}

impl<A: App> Server<A> {
    /// Registered `(method, pattern)` pairs in registration order
    #[must_use]
    pub fn routes(&self) -> &[(Method, String)] {
        &self.routes
    }

    #[must_use]
    pub fn context(&self) -> &A::Context {
        &self.context
    }

    #[must_use]
    pub fn config(&self) -> &A::Config {
        &self.config
    }

    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// `true` when `pathname` would be dispatched to a handler: a route entry
    /// matched (whatever its methods) or a fallback route is configured.
    #[must_use]
    pub fn has_route(&self, pathname: &str) -> bool {
        self.fallback.is_some() || self.trie.match_path(pathname).entry.is_some()
    }

    /// Run a parsed request through the pipeline and return the responder
    /// that should render it.
    ///
    /// The current span is passed to the handler as its logger.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no route matched and there is no fallback
    /// - `MethodNotAllowed` when the path matched but the method did not
    /// - `Unauthorized` when the route guard rejects the ability
    /// - any error from the ability function, or from execution when the
    ///   route has no error mapper for it
    pub fn handle(&self, request: &Request) -> anyhow::Result<Box<dyn Responder>> {
        let matched = self.trie.match_path(request.pathname());

        let descriptor = match (matched.entry, self.fallback.as_ref()) {
            (Some(entry), _) => entry
                .get(request.method())
                .ok_or_else(HttpError::method_not_allowed)?,
            (None, Some(fallback)) => {
                debug!(path = %request.pathname(), "No route matched, using fallback");
                fallback
            }
            (None, None) => return Err(HttpError::not_found().into()),
        };

        let ability = match &self.ability {
            Some(define) => define(AbilityArgs {
                request,
                ctx: &self.context,
                config: &self.config,
                injector: Injector::new(&self.providers, request, &self.context, &self.config),
            })?,
            None => A::Ability::default(),
        };

        if !descriptor.allows(&ability) {
            debug!(route = %descriptor.path(), "Guard rejected ability");
            return Err(HttpError::unauthorized().into());
        }

        let span = Span::current();
        match descriptor.exec(
            &self.context,
            &matched.params,
            request,
            ability,
            &span,
            &self.providers,
        ) {
            Ok(Reply::Responder(responder)) => Ok(responder),
            Ok(Reply::Value(payload)) => Ok(Box::new(JsonResponder::with_status(
                payload,
                descriptor.http_code(),
            ))),
            Err(err) => match (err.downcast_ref::<HttpError>(), descriptor.error_handler()) {
                (Some(http), Some(map)) => {
                    debug!(status = http.status().as_u16(), "Handler error mapped locally");
                    Ok(map(http))
                }
                _ => Err(err),
            },
        }
    }

    /// Parse a transport request, dispatch it and buffer the response.
    ///
    /// Never fails: errors are rendered by the error mapper. A failing
    /// responder discards whatever it had written.
    pub fn serve(&self, incoming: Incoming) -> HttpResponse {
        let request = match Request::from_incoming(incoming) {
            Ok(request) => request,
            Err(err) => return error_response(&err.into()),
        };

        let span = info_span!(
            "request",
            request_id = %request.id(),
            method = %request.method(),
            path = %request.pathname(),
        );
        let _entered = span.enter();
        info!("Processing request");

        let mut response = HttpResponse::default();
        let outcome = self
            .handle(&request)
            .and_then(|responder| responder.respond(&mut response));

        let response = match outcome {
            Ok(()) => response,
            Err(err) => error_response(&err),
        };
        info!(status = response.status.as_u16(), "Request complete");
        response
    }
}
