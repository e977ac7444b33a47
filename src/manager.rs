//! Worker Manager (spec.md §4.H): owns every registered worker's supervisor,
//! fans pooled workers out under indexed names, and aggregates their exit
//! into a single shutdown signal for the [`crate::app::Application`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{DiError, DiResult};
use crate::supervisor::{Supervisor, SupervisorExit, Worker, WorkerOptions};

/// Registers workers before `start()`, then supervises all of them for the
/// life of the application. See spec.md §3 "Worker Manager".
pub struct WorkerManager {
    entries: Mutex<Vec<(String, Arc<dyn Worker>, WorkerOptions)>>,
    running: AtomicBool,
    done: CancellationToken,
    critical_fail: Arc<Mutex<Option<Box<dyn Fn(String) + Send + Sync>>>>,
}

impl Default for WorkerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerManager {
    pub fn new() -> Self {
        WorkerManager {
            entries: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            done: CancellationToken::new(),
            critical_fail: Arc::new(Mutex::new(None)),
        }
    }

    /// `Register(worker, opts)`. Rejected once the manager has started
    /// (spec.md §4.H): supervisors are fanned out exactly once, at `start()`.
    pub fn register(&self, worker: Arc<dyn Worker>, options: WorkerOptions) -> DiResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(DiError::ManagerAlreadyRunning);
        }
        let base_name = worker.name();
        self.entries.lock().unwrap().push((base_name, worker, options));
        Ok(())
    }

    /// Installs the callback invoked (at most once per critical worker) when
    /// a worker flagged `critical: true` trips its circuit breaker.
    pub fn set_critical_fail_handler<F>(&self, handler: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        *self.critical_fail.lock().unwrap() = Some(Box::new(handler));
    }

    /// `Start(ctx)`: spawns one supervisor task per worker instance (pool
    /// size > 1 expands to `<name>-1`, `<name>-2`, ...; pool size 1 keeps the
    /// bare name). Idempotent: a second call is a no-op.
    pub async fn start(&self, ctx: CancellationToken) -> JoinSet<DiResult<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return JoinSet::new();
        }

        let entries = self.entries.lock().unwrap().clone();

        let mut set = JoinSet::new();
        for (base_name, worker, options) in entries {
            let pool_size = options.pool_size.max(1);
            for index in 0..pool_size {
                let name = if pool_size == 1 {
                    base_name.clone()
                } else {
                    format!("{base_name}-{}", index + 1)
                };

                let critical_fail_registry = self.critical_fail.clone();
                let notify = move |worker_name: String| {
                    if let Some(handler) = critical_fail_registry.lock().unwrap().as_ref() {
                        handler(worker_name);
                    }
                };

                let critical = options.critical;
                let supervisor = Arc::new(Supervisor::new(
                    worker.clone(),
                    name.clone(),
                    options.clone(),
                    Arc::new(notify),
                ));
                let run_ctx = ctx.child_token();
                set.spawn(async move {
                    info!(worker = %name, "supervisor starting");
                    match supervisor.run(run_ctx).await {
                        SupervisorExit::Stopped => Ok(()),
                        SupervisorExit::Tripped if critical => {
                            Err(DiError::CriticalWorkerFailed { worker: name })
                        }
                        SupervisorExit::Tripped => Err(DiError::CircuitTripped { worker: name }),
                    }
                });
            }
        }

        set
    }

    /// `Stop()`: cancels the shared context (the caller owns and cancels
    /// `ctx` passed to `start`) and waits for every supervisor task in `set`
    /// to finish. Errors are collected but do not stop the drain.
    pub async fn wait_all(&self, mut set: JoinSet<DiResult<()>>) -> Vec<DiError> {
        let mut errors = Vec::new();
        while let Some(result) = set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(%err, "worker exited with error");
                    errors.push(err);
                }
                Err(join_err) => warn!(%join_err, "supervisor task panicked"),
            }
        }
        self.done.cancel();
        errors
    }

    /// Resolves once every supervisor has exited (`wait_all` has completed).
    pub async fn done(&self) {
        self.done.cancelled().await;
    }
}
