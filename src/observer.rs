//! Optional resolution/lifecycle observer hooks, for applications that want
//! metrics (not just log lines) out of the container. The container, the
//! lifecycle runtime, and the worker supervisor all emit their own
//! `tracing` events directly (see each module); this trait exists
//! alongside that, not instead of it, for callers who want typed callbacks
//! rather than scraping log output.

use std::time::Duration;

use crate::key::Identity;

/// Implement this to receive resolution/lifecycle events as typed calls.
/// Every method has a `tracing`-backed default, so implementing only the
/// methods you care about is enough.
pub trait Observer: Send + Sync {
    fn resolving(&self, identity: &Identity) {
        tracing::trace!(%identity, "resolving");
    }

    fn resolved(&self, identity: &Identity, duration: Duration) {
        tracing::trace!(%identity, ?duration, "resolved");
    }

    fn cycle_detected(&self, chain: &[Identity]) {
        tracing::warn!(?chain, "circular dependency detected");
    }

    fn service_started(&self, identity: &Identity) {
        tracing::info!(%identity, "service started");
    }

    fn service_stopped(&self, identity: &Identity) {
        tracing::info!(%identity, "service stopped");
    }

    fn worker_failed(&self, worker: &str, error: &str) {
        tracing::warn!(%worker, %error, "worker run failed");
    }

    fn worker_tripped(&self, worker: &str) {
        tracing::error!(%worker, "worker circuit tripped");
    }
}

/// The default observer: every event just goes to `tracing`, nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {}
