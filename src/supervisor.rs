//! Worker Supervisor (spec.md §4.G): per-worker panic recovery, exponential
//! backoff, sliding-window circuit breaker, and dead-letter escalation.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::DiResult;
use crate::observer::{Observer, TracingObserver};

/// An entity implementing `start(ctx) -> error`, `stop(ctx) -> error`,
/// `name() -> string` (spec.md §3 "Worker Record").
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> String;
    /// Expected to run for the worker's whole lifetime, returning only on
    /// failure, voluntary clean exit, or when `ctx` is cancelled.
    async fn start(&self, ctx: CancellationToken) -> DiResult<()>;
    async fn stop(&self, ctx: CancellationToken) -> DiResult<()>;
}

/// Recognized worker options (spec.md §6 "Worker Options").
#[derive(Clone)]
pub struct WorkerOptions {
    pub pool_size: usize,
    pub critical: bool,
    pub stable_run_threshold: Duration,
    pub max_restarts: u32,
    pub circuit_window: Duration,
    pub on_dead_letter: Option<Arc<dyn Fn(DeadLetterEvent) + Send + Sync>>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        WorkerOptions {
            pool_size: 1,
            critical: false,
            stable_run_threshold: Duration::from_secs(30),
            max_restarts: 5,
            circuit_window: Duration::from_secs(600),
            on_dead_letter: None,
        }
    }
}

/// Delivered once, on trip, to `WorkerOptions::on_dead_letter`.
#[derive(Debug, Clone)]
pub struct DeadLetterEvent {
    pub name: String,
    pub final_error: String,
    pub panic_count: u32,
    pub window: Duration,
    pub timestamp: SystemTime,
}

/// Exponential backoff with jitter (spec.md §6 defaults: initial 1s, factor
/// 2, max 5m, jitter ±50%).
struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        let initial = Duration::from_secs(1);
        Backoff {
            initial,
            max: Duration::from_secs(300),
            multiplier: 2.0,
            current: initial,
        }
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Returns the delay to wait for this failure, then advances to the
    /// next (uncapped-until-max) delay.
    fn next_delay(&mut self) -> Duration {
        let base = self.current;
        let next_secs = (self.current.as_secs_f64() * self.multiplier).min(self.max.as_secs_f64());
        self.current = Duration::from_secs_f64(next_secs);
        jitter(base)
    }
}

fn jitter(base: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let factor = rng.gen_range(0.5..=1.5);
    Duration::from_secs_f64(base.as_secs_f64() * factor)
}

/// Per-worker supervision loop. State machine: `Idle -> Running ->
/// (Backoff|Stopped|Tripped) -> Running | Stopped`.
pub(crate) struct Supervisor {
    pub(crate) worker: Arc<dyn Worker>,
    pub(crate) name: String,
    pub(crate) options: WorkerOptions,
    pub(crate) critical_fail: Arc<dyn Fn(String) + Send + Sync>,
    observer: Arc<dyn Observer>,
    failure_count: AtomicU32,
}

/// Terminal outcome a supervisor reports back to the [`crate::manager::WorkerManager`].
pub(crate) enum SupervisorExit {
    Stopped,
    Tripped,
}

impl Supervisor {
    pub(crate) fn new(
        worker: Arc<dyn Worker>,
        name: String,
        options: WorkerOptions,
        critical_fail: Arc<dyn Fn(String) + Send + Sync>,
    ) -> Self {
        Supervisor {
            worker,
            name,
            options,
            critical_fail,
            observer: Arc::new(TracingObserver),
            failure_count: AtomicU32::new(0),
        }
    }

    pub(crate) fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Runs the supervision loop until the worker is cancelled or trips its
    /// circuit breaker. A single supervisor never runs two worker instances
    /// concurrently: each iteration spawns exactly one task and awaits it
    /// (or cancellation) before the next iteration begins.
    pub(crate) async fn run(self: Arc<Self>, ctx: CancellationToken) -> SupervisorExit {
        let mut window_start = Instant::now();
        let mut backoff = Backoff::new();

        loop {
            if ctx.is_cancelled() {
                return SupervisorExit::Stopped;
            }

            let run_start = Instant::now();
            let worker = self.worker.clone();
            let run_ctx = ctx.child_token();
            let task_ctx = run_ctx.clone();

            // Each run executes as its own task so a panic inside
            // `worker.start` is caught by tokio's task boundary instead of
            // unwinding through the supervisor loop (`catch_unwind` across
            // suspension points is not generally sound for arbitrary
            // futures; spawning isolates the panic exactly like a
            // dedicated goroutine would).
            let handle = tokio::spawn(async move { worker.start(task_ctx).await });

            tokio::select! {
                _ = ctx.cancelled() => {
                    run_ctx.cancel();
                    let _ = handle.await;
                    let _ = self.worker.stop(ctx.child_token()).await;
                    return SupervisorExit::Stopped;
                }
                outcome = handle => {
                    let failure = match outcome {
                        Ok(Ok(())) => {
                            // Clean voluntary exit: wait for shutdown, run
                            // stop, and exit without restarting.
                            ctx.cancelled().await;
                            let _ = self.worker.stop(ctx.child_token()).await;
                            return SupervisorExit::Stopped;
                        }
                        Ok(Err(err)) => err.to_string(),
                        Err(join_err) if join_err.is_panic() => format!("panic: {join_err}"),
                        Err(join_err) => join_err.to_string(),
                    };

                    match self.on_failure(failure, run_start, &mut window_start, &mut backoff) {
                        ControlFlow::Continue(delay) => {
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {}
                                _ = ctx.cancelled() => return SupervisorExit::Stopped,
                            }
                        }
                        ControlFlow::Break(()) => return SupervisorExit::Tripped,
                    }
                }
            }
        }
    }

    fn on_failure(
        &self,
        last_error: String,
        run_start: Instant,
        window_start: &mut Instant,
        backoff: &mut Backoff,
    ) -> ControlFlow<(), Duration> {
        let now = Instant::now();

        let count = if now.duration_since(*window_start) > self.options.circuit_window {
            *window_start = now;
            self.failure_count.store(1, Ordering::SeqCst);
            1
        } else {
            self.failure_count.fetch_add(1, Ordering::SeqCst) + 1
        };

        warn!(worker = %self.name, %last_error, failures = count, "worker run failed");
        self.observer.worker_failed(&self.name, &last_error);

        if count >= self.options.max_restarts {
            error!(worker = %self.name, %last_error, "worker circuit tripped");
            self.observer.worker_tripped(&self.name);
            self.fire_dead_letter(last_error, count);
            if self.options.critical {
                (self.critical_fail)(self.name.clone());
            }
            return ControlFlow::Break(());
        }

        if now.duration_since(run_start) >= self.options.stable_run_threshold {
            backoff.reset();
        }

        let delay = backoff.next_delay();
        info!(worker = %self.name, ?delay, "backing off before restart");
        ControlFlow::Continue(delay)
    }

    fn fire_dead_letter(&self, final_error: String, panic_count: u32) {
        let Some(handler) = &self.options.on_dead_letter else {
            return;
        };
        let event = DeadLetterEvent {
            name: self.name.clone(),
            final_error,
            panic_count,
            window: self.options.circuit_window,
            timestamp: SystemTime::now(),
        };
        // The dead-letter handler itself runs under panic recovery: a
        // misbehaving handler must not take down the supervisor loop.
        let handler = handler.clone();
        if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(event))) {
            error!(worker = %self.name, "dead-letter handler panicked: {:?}", payload.downcast_ref::<&str>());
        }
    }
}
