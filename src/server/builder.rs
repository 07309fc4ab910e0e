use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::{info, warn};

use crate::dispatcher::{AbilityArgs, AbilityFn, App, Server};
use crate::error::BuildError;
use crate::handler::{HandlerDescriptor, RouteBuilder};
use crate::inject::{ProviderArgs, Providers};
use crate::router::RouteTrie;

/// Object-safe view of a [`RouteBuilder`] with its validator types erased
trait CompileRoute<A: App> {
    fn method(&self) -> &Method;
    fn path(&self) -> &str;
    fn inject_keys(&self) -> Vec<String>;
    fn compile_route(self: Box<Self>, config: Arc<A::Config>) -> Result<HandlerDescriptor<A>, BuildError>;
}

impl<A, Q, B> CompileRoute<A> for RouteBuilder<A, Q, B>
where
    A: App,
    Q: 'static,
    B: 'static,
{
    fn method(&self) -> &Method {
        RouteBuilder::method(self)
    }

    fn path(&self) -> &str {
        RouteBuilder::path(self)
    }

    fn inject_keys(&self) -> Vec<String> {
        RouteBuilder::inject_keys(self).iter().map(ToString::to_string).collect()
    }

    fn compile_route(self: Box<Self>, config: Arc<A::Config>) -> Result<HandlerDescriptor<A>, BuildError> {
        (*self).compile(config)
    }
}

/// Assembles routes, providers and the ability function into a [`Server`].
///
/// ```rust
/// use serde_json::json;
/// use sprig::{App, RouteBuilder, ServerBuilder};
///
/// struct Demo;
/// impl App for Demo {
///     type Context = ();
///     type Config = ();
///     type Ability = ();
/// }
///
/// let server = ServerBuilder::<Demo>::new((), ())
///     .route(RouteBuilder::<Demo>::get("health").handle(|_| Ok(json!({"status": "ok"}).into())))
///     .build()
///     .unwrap();
/// assert_eq!(server.routes().len(), 1);
/// ```
pub struct ServerBuilder<A: App> {
    config: Arc<A::Config>,
    context: Arc<A::Context>,
    routes: Vec<Box<dyn CompileRoute<A>>>,
    fallback: Option<Box<dyn CompileRoute<A>>>,
    providers: Providers<A>,
    ability: Option<AbilityFn<A>>,
}

impl<A: App> ServerBuilder<A> {
    pub fn new(config: A::Config, context: A::Context) -> Self {
        Self {
            config: Arc::new(config),
            context: Arc::new(context),
            routes: Vec::new(),
            fallback: None,
            providers: Providers::new(),
            ability: None,
        }
    }

    /// Register a route. Registering the same method and pattern again
    /// replaces the earlier handler.
    #[must_use]
    pub fn route<Q: 'static, B: 'static>(mut self, route: RouteBuilder<A, Q, B>) -> Self {
        self.routes.push(Box::new(route));
        self
    }

    /// Handler used when no route matches the path. Its method and pattern
    /// are ignored for matching.
    #[must_use]
    pub fn fallback<Q: 'static, B: 'static>(mut self, route: RouteBuilder<A, Q, B>) -> Self {
        self.fallback = Some(Box::new(route));
        self
    }

    /// Register a provider under `key`
    #[must_use]
    pub fn provide<T, F>(mut self, key: &str, factory: F) -> Self
    where
        T: std::any::Any + Send + Sync,
        F: Fn(ProviderArgs<'_, A>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.providers.insert(key, factory);
        self
    }

    /// Compute the per-request ability. Without one, every request gets
    /// `A::Ability::default()`.
    #[must_use]
    pub fn define_ability<F>(mut self, define: F) -> Self
    where
        F: Fn(AbilityArgs<'_, A>) -> anyhow::Result<A::Ability> + Send + Sync + 'static,
    {
        self.ability = Some(Arc::new(define));
        self
    }

    fn check_providers(&self, route: &dyn CompileRoute<A>) -> Result<(), BuildError> {
        match route
            .inject_keys()
            .into_iter()
            .find(|key| !self.providers.contains(key))
        {
            Some(key) => Err(BuildError::UnknownProvider {
                key,
                method: route.method().clone(),
                path: route.path().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Compile every route and freeze the route tree.
    ///
    /// # Errors
    ///
    /// - [`BuildError::MissingCallback`] for a route without a callback
    /// - [`BuildError::UnknownProvider`] for an injected key nobody provides
    pub fn build(self) -> Result<Server<A>, BuildError> {
        let mut trie = RouteTrie::new();
        let mut listing: Vec<(Method, String)> = Vec::new();

        for route in &self.routes {
            self.check_providers(route.as_ref())?;
        }
        if let Some(fallback) = &self.fallback {
            self.check_providers(fallback.as_ref())?;
        }

        for route in self.routes {
            let descriptor = route.compile_route(Arc::clone(&self.config))?;
            let method = descriptor.method().clone();
            let path = descriptor.path().to_string();

            if trie
                .add_route(&path)
                .set(method.clone(), Arc::new(descriptor))
                .is_some()
            {
                warn!(method = %method, path = %path, "Handler replaced");
            } else {
                listing.push((method.clone(), path.clone()));
            }
            info!(method = %method, path = %path, "Mapped route");
        }

        let fallback = match self.fallback {
            Some(route) => {
                let descriptor = route.compile_route(Arc::clone(&self.config))?;
                info!(path = %descriptor.path(), "Mapped fallback route");
                Some(Arc::new(descriptor))
            }
            None => None,
        };

        Ok(Server {
            trie,
            fallback,
            context: self.context,
            config: self.config,
            providers: self.providers,
            ability: self.ability,
            routes: listing,
        })
    }
}

impl<A: App> fmt::Debug for ServerBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<String> = self
            .routes
            .iter()
            .map(|r| format!("{} {}", r.method(), r.path()))
            .collect();
        f.debug_struct("ServerBuilder")
            .field("routes", &routes)
            .field("fallback", &self.fallback.is_some())
            .field("providers", &self.providers)
            .field("ability", &self.ability.is_some())
            .finish_non_exhaustive()
    }
}
