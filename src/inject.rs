//! # Dependency Injection
//!
//! Providers are named factories producing request-scoped values. They are
//! kept in registration order and resolved in two ways:
//!
//! - **Eagerly** by [`Providers::resolve_all`] for a handler's declared keys.
//!   Resolution is strictly sequential: each provider completes before the
//!   next one starts, so later providers observe side effects of earlier ones.
//! - **Lazily** through an [`Injector`], which resolves a key only when
//!   [`Injector::get`] is called. The ability function and providers
//!   themselves receive an injector.
//!
//! Values are not memoised: every resolution calls the factory again.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, warn};

use crate::dispatcher::App;
use crate::server::Request;

/// A type-erased provided value
pub type Provided = Arc<dyn Any + Send + Sync>;

type ProviderFn<A> = Arc<dyn Fn(ProviderArgs<'_, A>) -> anyhow::Result<Provided> + Send + Sync>;

/// Arguments handed to a provider factory
pub struct ProviderArgs<'r, A: App> {
    pub request: &'r Request,
    pub ctx: &'r A::Context,
    pub config: &'r A::Config,
    /// Lazy access to the other providers
    pub injector: Injector<'r, A>,
}

/// Ordered association of provider keys to factories
pub struct Providers<A: App> {
    entries: Vec<(Arc<str>, ProviderFn<A>)>,
}

impl<A: App> Default for Providers<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: App> Clone for Providers<A> {
    fn clone(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(k, f)| (Arc::clone(k), Arc::clone(f)))
                .collect(),
        }
    }
}

impl<A: App> fmt::Debug for Providers<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

impl<A: App> Providers<A> {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register a typed factory under `key`.
    ///
    /// Re-registering a key replaces the factory but keeps its original
    /// position.
    pub fn insert<T, F>(&mut self, key: &str, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(ProviderArgs<'_, A>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let erased: ProviderFn<A> = Arc::new(move |args: ProviderArgs<'_, A>| -> anyhow::Result<Provided> {
            Ok(Arc::new(factory(args)?))
        });

        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k.as_ref() == key) {
            warn!(key = %key, "Provider replaced");
            slot.1 = erased;
        } else {
            self.entries.push((Arc::from(key), erased));
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.as_ref() == key)
    }

    /// Keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke the factory registered under `key` once.
    ///
    /// # Errors
    ///
    /// Unknown keys and whatever the factory returns.
    pub fn resolve(
        &self,
        key: &str,
        request: &Request,
        ctx: &A::Context,
        config: &A::Config,
    ) -> anyhow::Result<Provided> {
        let factory = self
            .entries
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, f)| f)
            .ok_or_else(|| anyhow!("no provider registered for '{key}'"))?;

        debug!(key = %key, "Resolving provider");
        factory(ProviderArgs {
            request,
            ctx,
            config,
            injector: Injector::new(self, request, ctx, config),
        })
    }

    /// Resolve `keys` one after another, in order.
    ///
    /// Duplicate keys are resolved again; the last value wins on lookup.
    ///
    /// # Errors
    ///
    /// The first failing provider aborts resolution.
    pub fn resolve_all(
        &self,
        keys: &[Arc<str>],
        request: &Request,
        ctx: &A::Context,
        config: &A::Config,
    ) -> anyhow::Result<Injected> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.resolve(key, request, ctx, config)?;
            values.push((Arc::clone(key), value));
        }
        Ok(Injected { values })
    }
}

/// On-demand accessor for every registered provider
pub struct Injector<'r, A: App> {
    providers: &'r Providers<A>,
    request: &'r Request,
    ctx: &'r A::Context,
    config: &'r A::Config,
}

impl<A: App> Clone for Injector<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: App> Copy for Injector<'_, A> {}

impl<'r, A: App> Injector<'r, A> {
    pub(crate) fn new(
        providers: &'r Providers<A>,
        request: &'r Request,
        ctx: &'r A::Context,
        config: &'r A::Config,
    ) -> Self {
        Self {
            providers,
            request,
            ctx,
            config,
        }
    }

    /// Resolve `key` now and downcast it to `T`.
    ///
    /// # Errors
    ///
    /// Unknown keys, provider failures, and values of another type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> anyhow::Result<Arc<T>> {
        self.providers
            .resolve(key, self.request, self.ctx, self.config)?
            .downcast::<T>()
            .map_err(|_| anyhow!("provider '{key}' does not produce a {}", type_name::<T>()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.providers.keys()
    }
}

/// Values resolved for a handler's declared keys
#[derive(Default)]
pub struct Injected {
    values: Vec<(Arc<str>, Provided)>,
}

impl Injected {
    /// Borrow the value injected under `key`, if present and of type `T`
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values
            .iter()
            .rfind(|(k, _)| k.as_ref() == key)
            .and_then(|(_, v)| v.downcast_ref::<T>())
    }

    /// Like [`Injected::get`], but a missing value is an error
    ///
    /// # Errors
    ///
    /// When `key` was not injected or holds another type.
    pub fn require<T: Any>(&self, key: &str) -> anyhow::Result<&T> {
        self.get(key)
            .ok_or_else(|| anyhow!("no injected '{key}' of type {}", type_name::<T>()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Incoming;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestApp;

    impl App for TestApp {
        type Context = AtomicUsize;
        type Config = String;
        type Ability = ();
    }

    fn request() -> Request {
        Request::from_incoming(Incoming::new("GET", "/")).unwrap()
    }

    #[test]
    fn test_resolve_all_is_sequential() {
        let mut providers = Providers::<TestApp>::new();
        providers.insert("a", |args| Ok(args.ctx.fetch_add(1, Ordering::SeqCst) + 1));
        providers.insert("b", |args| Ok(args.ctx.load(Ordering::SeqCst) * 10));

        let ctx = AtomicUsize::new(0);
        let keys: Vec<Arc<str>> = vec![Arc::from("a"), Arc::from("b")];
        let injected = providers.resolve_all(&keys, &request(), &ctx, &String::new()).unwrap();

        assert_eq!(injected.get::<usize>("a"), Some(&1));
        assert_eq!(injected.get::<usize>("b"), Some(&10));
    }

    #[test]
    fn test_replacing_keeps_position() {
        let mut providers = Providers::<TestApp>::new();
        providers.insert("a", |_| Ok(1_u8));
        providers.insert("b", |_| Ok(2_u8));
        providers.insert("a", |_| Ok(3_u8));
        assert_eq!(providers.keys().collect::<Vec<_>>(), vec!["a", "b"]);

        let ctx = AtomicUsize::new(0);
        let req = request();
        let value = providers.resolve("a", &req, &ctx, &String::new()).unwrap();
        assert_eq!(value.downcast_ref::<u8>(), Some(&3));
    }

    #[test]
    fn test_injector_is_lazy_and_typed() {
        let mut providers = Providers::<TestApp>::new();
        providers.insert("count", |args| Ok(args.ctx.fetch_add(1, Ordering::SeqCst)));
        providers.insert("label", |args| Ok(format!("{}:{}", args.config, *args.injector.get::<usize>("count")?)));

        let ctx = AtomicUsize::new(0);
        let req = request();
        let config = String::from("cfg");
        let injector = Injector::new(&providers, &req, &ctx, &config);
        assert_eq!(ctx.load(Ordering::SeqCst), 0);

        assert_eq!(*injector.get::<String>("label").unwrap(), "cfg:0");
        assert_eq!(ctx.load(Ordering::SeqCst), 1);
        assert!(injector.get::<String>("count").is_err());
        assert!(injector.get::<usize>("missing").is_err());
    }

    #[test]
    fn test_failing_provider_aborts() {
        let mut providers = Providers::<TestApp>::new();
        providers.insert("bad", |_| -> anyhow::Result<u8> { anyhow::bail!("boom") });
        providers.insert("never", |args| Ok(args.ctx.fetch_add(1, Ordering::SeqCst)));

        let ctx = AtomicUsize::new(0);
        let keys: Vec<Arc<str>> = vec![Arc::from("bad"), Arc::from("never")];
        let err = providers.resolve_all(&keys, &request(), &ctx, &String::new()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(ctx.load(Ordering::SeqCst), 0);
    }
}
