//! Per-registration metadata: lifestyle, provider, lifecycle hooks.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::container::Container;
use crate::error::DiResult;
use crate::key::Identity;
use crate::lifestyle::Lifestyle;

pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub(crate) type FactoryFn = Arc<dyn Fn(&Container) -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type HookFn = Arc<dyn Fn(AnyArc, CancellationToken) -> BoxFuture<DiResult<()>> + Send + Sync>;

pub(crate) enum Provider {
    Factory(FactoryFn),
    Instance(AnyArc),
}

/// Immutable registration metadata for one `(type, name)` binding. See
/// spec.md §3 "Service Descriptor" and §4.B.
pub(crate) struct Descriptor {
    pub(crate) identity: Identity,
    pub(crate) lifestyle: Lifestyle,
    pub(crate) provider: Provider,
    pub(crate) start_hook: Option<HookFn>,
    pub(crate) stop_hook: Option<HookFn>,
    /// Populated on first non-transient resolution; never written to for
    /// Transient bindings. `OnceCell::get_or_try_init` gives the
    /// "singleflight" semantics spec.md's concurrency model requires:
    /// concurrent waiters share one in-flight construction, and a failed
    /// attempt is never cached (`get_or_try_init` does not store `Err`).
    pub(crate) cache: OnceCell<AnyArc>,
}

impl Descriptor {
    pub(crate) fn is_lifecycle_participant(&self) -> bool {
        self.start_hook.is_some() || self.stop_hook.is_some()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("identity", &self.identity)
            .field("lifestyle", &self.lifestyle)
            .field("has_start_hook", &self.start_hook.is_some())
            .field("has_stop_hook", &self.stop_hook.is_some())
            .finish()
    }
}
