//! Application (spec.md §4.I): the top-level runtime gluing one
//! [`Container`], one [`LifecycleRuntime`], and one [`WorkerManager`]
//! together behind a single `run(ctx)` call.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::lifecycle::{AppState, LifecycleRuntime};
use crate::manager::WorkerManager;

/// Owns the container, the worker manager, and the lifecycle runtime for one
/// process. See spec.md §3 "Application" and §4.I.
pub struct Application {
    pub container: Container,
    pub workers: WorkerManager,
    lifecycle: LifecycleRuntime,
    state: AtomicU8,
}

impl Application {
    pub fn new(start_timeout: Duration, stop_timeout: Duration) -> Self {
        Application {
            container: Container::new(),
            workers: WorkerManager::new(),
            lifecycle: LifecycleRuntime::new(start_timeout, stop_timeout),
            state: AtomicU8::new(AppState::Configuring as u8),
        }
    }

    pub fn state(&self) -> AppState {
        match self.state.load(Ordering::SeqCst) {
            0 => AppState::Configuring,
            1 => AppState::Built,
            2 => AppState::Running,
            3 => AppState::Stopping,
            _ => AppState::Stopped,
        }
    }

    fn set_state(&self, state: AppState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Drives the whole application lifecycle: build, start lifecycle
    /// services in topological order, start workers, then block until an OS
    /// signal, a critical worker failure, or external cancellation of `ctx`
    /// requests shutdown. Always attempts a full stop before returning, and
    /// aggregates every error encountered along the way.
    pub async fn run(&self, ctx: CancellationToken) -> DiResult<()> {
        self.container.build()?;
        self.set_state(AppState::Built);

        let shutdown = ctx.child_token();
        spawn_signal_bridge(shutdown.clone());

        if let Err(err) = self.lifecycle.start_all(&self.container, &shutdown).await {
            error!(%err, "lifecycle start failed");
            self.set_state(AppState::Stopped);
            return Err(err);
        }

        self.workers.set_critical_fail_handler({
            let shutdown = shutdown.clone();
            move |worker: String| {
                error!(%worker, "critical worker failed, requesting shutdown");
                shutdown.cancel();
            }
        });

        let join_set = self.workers.start(shutdown.clone()).await;
        self.set_state(AppState::Running);
        info!("application running");

        // Wake on whichever comes first: an external/critical-worker
        // cancellation of `shutdown`, or every supervisor draining out of
        // the `JoinSet` on its own (spec.md §4.I step 5's third condition —
        // `Done()` closes). An application with no registered workers has
        // an empty `JoinSet`, so `wait_all` resolves immediately and this
        // never blocks (spec.md §8's "empty application" boundary case).
        //
        // `wait_all_fut` must be polled to completion in exactly one of the
        // two arms below, never in both: once a `select!` branch observes a
        // future as `Ready`, polling that same future again panics ("`async
        // fn` resumed after completion"). So each arm both cancels
        // `shutdown` (idempotent either way) and produces `worker_errors`
        // itself, instead of awaiting `wait_all_fut` a second time after the
        // `select!`.
        let mut wait_all_fut = std::pin::pin!(self.workers.wait_all(join_set));
        let worker_errors = tokio::select! {
            _ = shutdown.cancelled() => {
                shutdown.cancel();
                wait_all_fut.await
            }
            errors = &mut wait_all_fut => {
                shutdown.cancel();
                errors
            }
        };
        self.set_state(AppState::Stopping);
        info!("application stopping");

        let stop_ctx = CancellationToken::new();
        let lifecycle_result = self.lifecycle.stop_all(&self.container, &stop_ctx).await;
        self.set_state(AppState::Stopped);

        if let Some(err) = worker_errors
            .into_iter()
            .find(|e| matches!(e, DiError::CircuitTripped { .. } | DiError::CriticalWorkerFailed { .. }))
        {
            return Err(err);
        }
        lifecycle_result
    }
}

/// Bridges `SIGINT`/`SIGTERM` (Unix) or Ctrl-C (all platforms) into
/// cancelling `token`, matching spec.md §4.I's "external signal requests
/// shutdown" trigger.
fn spawn_signal_bridge(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(err) => {
                    error!(%err, "failed to install SIGTERM handler");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
                _ = token.cancelled() => return,
            }
        }
        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = token.cancelled() => return,
            }
        }
        info!("shutdown signal received");
        token.cancel();
    });
}
