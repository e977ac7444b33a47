//! The Container: owns the Type Registry and the Resolver, and exposes the
//! registration/resolution/build API (spec.md §4.D).

use std::any::TypeId;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::chain;
use crate::descriptor::{AnyArc, BoxFuture, Descriptor, FactoryFn, HookFn, Provider};
use crate::error::{DiError, DiResult};
use crate::graph::{self, Graph, ProviderScope};
use crate::inject::Inject;
use crate::key::Identity;
use crate::lifestyle::Lifestyle;
use crate::observer::{Observer, TracingObserver};
use crate::registry::Registry;

/// The process-wide object owning the type registry, instance cache, and
/// resolver. See spec.md §3 "Container" and §4.D.
pub struct Container {
    pub(crate) registry: RwLock<Registry>,
    pub(crate) graph: Graph,
    built: AtomicBool,
    observer: RwLock<Arc<dyn Observer>>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Container {
            registry: RwLock::new(Registry::default()),
            graph: Graph::default(),
            built: AtomicBool::new(false),
            observer: RwLock::new(Arc::new(TracingObserver)),
        }
    }

    /// Replaces the resolution observer (default [`TracingObserver`]). Takes
    /// effect on the next `resolve*` call; in-flight resolutions keep using
    /// whichever observer they already read.
    pub fn set_observer(&self, observer: Arc<dyn Observer>) {
        *self.observer.write().unwrap() = observer;
    }

    /// Begins registering a new binding for `T`. See [`Registration`].
    ///
    /// `T: Inject` is required uniformly so the resolver has one
    /// post-construction hook to call for every provider result; types with
    /// nothing to inject pick up `Inject`'s default no-op body (`impl Inject
    /// for T {}`), and types with `#[inject]`-tagged fields use
    /// `#[derive(Inject)]`.
    pub fn register<T: Inject + Send + Sync + 'static>(&self) -> Registration<'_, T> {
        Registration::new(self)
    }

    /// `Has<T>(container) -> bool`.
    pub fn has<T: 'static>(&self) -> bool {
        let identity = Identity::of::<T>();
        self.registry.read().unwrap().contains(&identity)
    }

    /// `Resolve<T>(container) -> (T, error)` for the default (unnamed) binding.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.resolve_named(None)
    }

    /// `Resolve<T>(container, opts)` where `opts` names a binding.
    pub fn resolve_named<T: Send + Sync + 'static>(&self, name: Option<&'static str>) -> DiResult<Arc<T>> {
        let identity = match name {
            Some(n) => Identity::named::<T>(n),
            None => Identity::of::<T>(),
        };
        let any = self.resolve_any(identity)?;
        any.downcast::<T>()
            .map_err(|_| DiError::NotFound(identity))
    }

    /// `ResolveAll<T>(container) -> ([]T, error)`: every descriptor matching
    /// `T` (named and unnamed), in registration order.
    pub fn resolve_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        let type_id = TypeId::of::<T>();
        let identities: Vec<Identity> = {
            let registry = self.registry.read().unwrap();
            registry.all_for_type(type_id).iter().map(|d| d.identity).collect()
        };
        identities
            .into_iter()
            .map(|identity| {
                self.resolve_any(identity)
                    .and_then(|any| any.downcast::<T>().map_err(|_| DiError::NotFound(identity)))
            })
            .collect()
    }

    /// `Build(container) -> error`. Freezes the registry and eagerly
    /// resolves every Eager descriptor. Idempotent: a second call is a no-op
    /// *after a first successful call*. A failed build leaves the container
    /// un-built, so a later `build()` retries the eager graph rather than
    /// reporting stale success (spec.md §4.D/§8: idempotence is defined in
    /// terms of "identical result after first *success*").
    pub fn build(&self) -> DiResult<()> {
        if self.built.load(Ordering::SeqCst) {
            return Ok(());
        }

        let eager: Vec<Identity> = {
            let registry = self.registry.read().unwrap();
            registry
                .iter()
                .filter(|d| d.lifestyle == Lifestyle::Eager)
                .map(|d| d.identity)
                .collect()
        };

        for identity in eager {
            if let Err(err) = self.resolve_any(identity) {
                return Err(err.into_build_failed(identity));
            }
        }

        self.built.store(true, Ordering::SeqCst);
        debug!("container built");
        Ok(())
    }

    pub(crate) fn is_built(&self) -> bool {
        self.built.load(Ordering::SeqCst)
    }

    /// The core of spec.md §4.C's resolver algorithm, operating on type-erased
    /// `Arc<dyn Any + Send + Sync>` values so it can be shared by
    /// `resolve_named`, `resolve_all`, and eager resolution during `build()`.
    fn resolve_any(&self, identity: Identity) -> DiResult<AnyArc> {
        let observer = self.observer.read().unwrap().clone();
        observer.resolving(&identity);
        let started = Instant::now();
        let result = chain::with_chain(identity, || self.resolve_any_uncycled(identity));
        match &result {
            Ok(_) => observer.resolved(&identity, started.elapsed()),
            Err(DiError::Cycle(chain)) => observer.cycle_detected(chain),
            Err(_) => {}
        }
        result
    }

    /// Resolves by [`Identity`] directly, for callers (the lifecycle
    /// runtime, the worker manager) that already hold an identity rather
    /// than a static type parameter.
    pub(crate) fn resolve_erased(&self, identity: Identity) -> DiResult<AnyArc> {
        self.resolve_any(identity)
    }

    fn resolve_any_uncycled(&self, identity: Identity) -> DiResult<AnyArc> {
        trace!(?identity, "resolving");

        let descriptor = {
            let registry = self.registry.read().unwrap();
            registry.get(&identity).ok_or(DiError::NotFound(identity))?
        };

        // Record the dependency edge before doing any work: if the current
        // thread is already inside another lifecycle participant's
        // provider, and this identity is also a lifecycle participant,
        // spec.md 4.E wants the edge recorded regardless of whether this
        // turns out to be a cache hit.
        if let Some(dependent) = graph::current_provider() {
            if descriptor.is_lifecycle_participant() {
                let registry = self.registry.read().unwrap();
                let dependent_is_participant = registry
                    .get(&dependent)
                    .map(|d| d.is_lifecycle_participant())
                    .unwrap_or(false);
                drop(registry);
                if dependent_is_participant {
                    self.graph.add_edge(dependent, identity);
                }
            }
        }

        // Fast path: already-cached Singleton/Eager/Instance value.
        if let Some(cached) = descriptor.cache.get() {
            return Ok(cached.clone());
        }

        self.construct(identity, descriptor)
    }

    /// Invokes the provider, applies field injection, and (for cached
    /// lifestyles) stores the result via `OnceCell::get_or_try_init` so
    /// concurrent callers share one in-flight construction and a failed
    /// attempt is never cached.
    ///
    /// Takes `descriptor` already cloned out of the registry lock: the
    /// factory closure may re-enter `resolve_any` for a nested dependency,
    /// and that must not happen while holding the registry's `RwLock`.
    fn construct(&self, identity: Identity, descriptor: Arc<Descriptor>) -> DiResult<AnyArc> {
        let factory: FactoryFn = match &descriptor.provider {
            Provider::Factory(f) => f.clone(),
            Provider::Instance(v) => return Ok(v.clone()),
        };

        let build_one = || -> DiResult<AnyArc> {
            let _scope = ProviderScope::enter(identity);
            factory(self)
        };

        if descriptor.lifestyle.is_cached() {
            // `get_or_try_init` gives the per-identity singleflight gate
            // spec.md §5 requires: concurrent waiters block on the same
            // `OnceCell`, and an `Err` is never stored.
            descriptor.cache.get_or_try_init(build_one).cloned()
        } else {
            build_one()
        }
    }
}

/// Fluent registration builder returned by `Container::register::<T>()`.
/// See spec.md §4.A/§4.B and §6 "Registration (fluent builder)".
///
/// Unlike the language-neutral spec (where the builder mutates a descriptor
/// already inserted into the registry), this is a consuming Rust builder:
/// nothing is inserted until [`Registration::finish`] is called, so
/// registration errors (duplicate binding, hooks on a Transient/Instance
/// lifestyle) surface as a `Result` at the call site rather than silently,
/// with no intermediate partially-registered state observable from another
/// thread.
pub struct Registration<'c, T> {
    container: &'c Container,
    name: Option<&'static str>,
    lifestyle: Lifestyle,
    provider: Option<ProviderBuilder<T>>,
    start_hook: Option<HookFn>,
    stop_hook: Option<HookFn>,
}

enum ProviderBuilder<T> {
    Factory(Arc<dyn Fn(&Container) -> DiResult<T> + Send + Sync>),
    Instance(T),
}

impl<'c, T: Inject + Send + Sync + 'static> Registration<'c, T> {
    fn new(container: &'c Container) -> Self {
        Registration {
            container,
            name: None,
            lifestyle: Lifestyle::default(),
            provider: None,
            start_hook: None,
            stop_hook: None,
        }
    }

    /// `.Provider(fn: (Container) -> (T, error?))`.
    pub fn provider<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
    {
        self.provider = Some(ProviderBuilder::Factory(Arc::new(factory)));
        self
    }

    /// `.Instance(value: T)`. Also forces the Instance lifestyle: no
    /// provider is ever invoked and field injection is never applied.
    pub fn instance(mut self, value: T) -> Self {
        self.provider = Some(ProviderBuilder::Instance(value));
        self.lifestyle = Lifestyle::Instance;
        self
    }

    /// `.Named(string)`.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// `.Lifestyle({Singleton|Eager|Transient|Instance})`.
    pub fn lifestyle(mut self, lifestyle: Lifestyle) -> Self {
        self.lifestyle = lifestyle;
        self
    }

    /// `.OnStart(fn: (Context, T) -> error)`.
    pub fn on_start<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.start_hook = Some(erase_hook(hook));
        self
    }

    /// `.OnStop(fn: (Context, T) -> error)`.
    pub fn on_stop<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.stop_hook = Some(erase_hook(hook));
        self
    }

    /// Validates and inserts the descriptor into the registry. Errors at
    /// registration (spec.md §4.A): duplicate `(T, name)`, or start/stop
    /// hooks attached to a Transient or Instance lifestyle.
    pub fn finish(self) -> DiResult<()> {
        let identity = match self.name {
            Some(n) => Identity::named::<T>(n),
            None => Identity::of::<T>(),
        };

        let has_hooks = self.start_hook.is_some() || self.stop_hook.is_some();
        if has_hooks && matches!(self.lifestyle, Lifestyle::Transient | Lifestyle::Instance) {
            return Err(DiError::InvalidHookPlacement(identity));
        }

        let provider = match self.provider {
            Some(ProviderBuilder::Instance(value)) => Provider::Instance(Arc::new(value)),
            Some(ProviderBuilder::Factory(f)) => {
                let erased: FactoryFn = Arc::new(move |container| {
                    let mut value = f(container)?;
                    // spec.md 4.C step 7: field-tag injection runs on every
                    // non-Instance result, here realized as the `Inject`
                    // trait call every provider result type implements.
                    value.inject_fields(container)?;
                    Ok(Arc::new(value) as AnyArc)
                });
                Provider::Factory(erased)
            }
            None => {
                return Err(DiError::NotFound(identity));
            }
        };

        let cache = once_cell::sync::OnceCell::new();
        if let Provider::Instance(value) = &provider {
            let _ = cache.set(value.clone());
        }

        let descriptor = Descriptor {
            identity,
            lifestyle: self.lifestyle,
            provider,
            start_hook: self.start_hook,
            stop_hook: self.stop_hook,
            cache,
        };

        self.container.registry.write().unwrap().insert(descriptor)
    }
}

fn erase_hook<T, F, Fut>(hook: F) -> HookFn
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DiResult<()>> + Send + 'static,
{
    Arc::new(move |value: AnyArc, token: CancellationToken| -> BoxFuture<DiResult<()>> {
        match value.downcast::<T>() {
            Ok(typed) => Box::pin(hook(typed, token)),
            Err(_) => Box::pin(async { Ok(()) }),
        }
    })
}
