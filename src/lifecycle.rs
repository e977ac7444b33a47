//! Lifecycle Runtime (spec.md §4.F): topologically orders lifecycle
//! participants, starts them in that order with a bounded timeout, and
//! reverses order on shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::container::Container;
use crate::descriptor::Descriptor;
use crate::error::{DiError, DiResult};
use crate::key::Identity;
use crate::observer::{Observer, TracingObserver};

/// Overall state of the owning [`crate::app::Application`]. Transitions are
/// one-way; re-entry into an earlier state is forbidden (spec.md §3
/// "Lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Configuring,
    Built,
    Running,
    Stopping,
    Stopped,
}

/// Topologically orders the dependency DAG the resolver observed while
/// building lifecycle participants, then drives start/stop over it.
pub struct LifecycleRuntime {
    start_timeout: Duration,
    stop_timeout: Duration,
    started: std::sync::Mutex<Vec<Identity>>,
    observer: Arc<dyn Observer>,
}

impl LifecycleRuntime {
    pub fn new(start_timeout: Duration, stop_timeout: Duration) -> Self {
        LifecycleRuntime {
            start_timeout,
            stop_timeout,
            started: std::sync::Mutex::new(Vec::new()),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the lifecycle observer (default [`TracingObserver`]).
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    fn participants(&self, container: &Container) -> Vec<Arc<Descriptor>> {
        let registry = container.registry.read().unwrap();
        registry
            .iter()
            .filter(|d| d.is_lifecycle_participant())
            .cloned()
            .collect()
    }

    /// Computes the topological start order: registration order breaks ties
    /// between independent branches (spec.md §9 "Deterministic topological
    /// order"), and dependencies (edge targets) are ordered before the
    /// dependents that reference them.
    ///
    /// Requires every participant to have already been resolved at least
    /// once (see `start_all`'s warm-up pass) so the dependency graph
    /// (spec.md §4.E) is fully populated: an edge is only recorded while a
    /// provider actually runs, so a participant nobody has resolved yet
    /// would otherwise look independent even if it resolves another
    /// participant internally.
    fn topological_order(
        &self,
        container: &Container,
        participants: &[Arc<Descriptor>],
    ) -> DiResult<Vec<(Identity, Arc<Descriptor>)>> {
        let by_identity: HashMap<Identity, Arc<Descriptor>> =
            participants.iter().map(|d| (d.identity, d.clone())).collect();
        let edges = container.graph.edges_snapshot();

        #[derive(PartialEq, Eq)]
        enum Mark {
            InProgress,
            Done,
        }
        let mut marks: HashMap<Identity, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(participants.len());

        fn visit(
            id: Identity,
            by_identity: &HashMap<Identity, Arc<Descriptor>>,
            edges: &HashMap<Identity, Vec<Identity>>,
            marks: &mut HashMap<Identity, Mark>,
            order: &mut Vec<(Identity, Arc<Descriptor>)>,
            stack: &mut Vec<Identity>,
        ) -> DiResult<()> {
            match marks.get(&id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::InProgress) => {
                    let mut cycle = stack.clone();
                    cycle.push(id);
                    return Err(DiError::LifecycleCycle(cycle));
                }
                None => {}
            }
            marks.insert(id, Mark::InProgress);
            stack.push(id);
            if let Some(deps) = edges.get(&id) {
                for dep in deps {
                    if by_identity.contains_key(dep) {
                        visit(*dep, by_identity, edges, marks, order, stack)?;
                    }
                }
            }
            stack.pop();
            marks.insert(id, Mark::Done);
            if let Some(descriptor) = by_identity.get(&id) {
                order.push((id, descriptor.clone()));
            }
            Ok(())
        }

        let mut stack = Vec::new();
        for descriptor in participants {
            visit(
                descriptor.identity,
                &by_identity,
                &edges,
                &mut marks,
                &mut order,
                &mut stack,
            )?;
        }

        Ok(order)
    }

    /// Starts every lifecycle participant. A warm-up pass resolves each
    /// participant at least once, in registration order, so every
    /// provider-to-provider dependency between participants has had a
    /// chance to record its edge in the dependency graph (spec.md §4.E)
    /// before topological order is computed; resolution is cached, so the
    /// later ordered pass that actually invokes start hooks is a cache hit
    /// for every participant. On error, stops everything already started,
    /// in reverse order, best-effort, then returns the original error.
    pub async fn start_all(&self, container: &Container, ctx: &CancellationToken) -> DiResult<()> {
        let participants = self.participants(container);

        for descriptor in &participants {
            if let Err(err) = container.resolve_erased(descriptor.identity) {
                error!(identity = %descriptor.identity, %err, "failed to construct lifecycle participant");
                return Err(err);
            }
        }

        let order = self.topological_order(container, &participants)?;

        for (identity, descriptor) in order {
            if ctx.is_cancelled() {
                self.unwind_started(container).await;
                return Err(DiError::StartTimeout(identity));
            }

            let value = match container.resolve_erased(identity) {
                Ok(v) => v,
                Err(err) => {
                    error!(%identity, %err, "failed to construct lifecycle participant");
                    self.unwind_started(container).await;
                    return Err(err);
                }
            };

            if let Some(hook) = &descriptor.start_hook {
                let fut = hook(value, ctx.child_token());
                match run_with_timeout(fut, self.start_timeout, identity, true).await {
                    Ok(()) => {
                        info!(%identity, "service started");
                        self.observer.service_started(&identity);
                    }
                    Err(err) => {
                        error!(%identity, %err, "service failed to start");
                        self.unwind_started(container).await;
                        return Err(err);
                    }
                }
            }

            self.started.lock().unwrap().push(identity);
        }

        Ok(())
    }

    /// Stops every successfully started participant in exact reverse order.
    /// Errors are accumulated and logged but never abort remaining stops.
    pub async fn stop_all(&self, container: &Container, ctx: &CancellationToken) -> DiResult<()> {
        let _ = ctx;
        self.unwind_started(container).await;
        Ok(())
    }

    async fn unwind_started(&self, container: &Container) {
        let started: Vec<Identity> = {
            let mut guard = self.started.lock().unwrap();
            std::mem::take(&mut *guard)
        };

        let registry = container.registry.read().unwrap();
        let descriptors: Vec<Arc<Descriptor>> = started
            .iter()
            .rev()
            .filter_map(|id| registry.get(id))
            .collect();
        drop(registry);

        for descriptor in descriptors {
            let Some(hook) = &descriptor.stop_hook else {
                continue;
            };
            let Some(value) = descriptor.cache.get().cloned() else {
                continue;
            };
            let stop_ctx = CancellationToken::new();
            let fut = hook(value, stop_ctx.child_token());
            match run_with_timeout(fut, self.stop_timeout, descriptor.identity, false).await {
                Ok(()) => {
                    info!(identity = %descriptor.identity, "service stopped");
                    self.observer.service_stopped(&descriptor.identity);
                }
                Err(err) => error!(identity = %descriptor.identity, %err, "stop hook failed"),
            }
        }
    }
}

async fn run_with_timeout(
    fut: impl std::future::Future<Output = DiResult<()>>,
    timeout: Duration,
    identity: Identity,
    is_start: bool,
) -> DiResult<()> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) if is_start => Err(DiError::StartTimeout(identity)),
        Err(_) => Err(DiError::StopTimeout(identity)),
    }
}
