//! Dependency Graph Builder (spec.md §4.E).
//!
//! Observes the resolver as it satisfies nested dependencies and records an
//! edge `dependent -> dependency` whenever *both* ends are lifecycle
//! participants (i.e. carry a start or stop hook). The resulting DAG is
//! what the Lifecycle Runtime topologically sorts.
//!
//! New design for this crate: the donor's `graph_export.rs` targets
//! visualization/serialization of an already-built graph, not observation
//! during resolution, so this module is written fresh rather than adapted,
//! though it keeps the donor's naming (`GraphNode`/`GraphEdge`) where it fits.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::key::Identity;

thread_local! {
    /// The lifecycle-participant identity whose provider is currently
    /// executing on this thread, if any. Mirrors spec.md 4.E's "thread-local
    /// 'current provider' identifier".
    static CURRENT_PROVIDER: RefCell<Vec<Identity>> = RefCell::new(Vec::new());
}

/// RAII guard that marks `identity` as the current provider for the
/// duration of its scope, restoring the previous value (if any, for nested
/// lifecycle-participant providers) on drop.
pub(crate) struct ProviderScope;

impl ProviderScope {
    pub(crate) fn enter(identity: Identity) -> Self {
        CURRENT_PROVIDER.with(|stack| stack.borrow_mut().push(identity));
        ProviderScope
    }
}

impl Drop for ProviderScope {
    fn drop(&mut self) {
        CURRENT_PROVIDER.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub(crate) fn current_provider() -> Option<Identity> {
    CURRENT_PROVIDER.with(|stack| stack.borrow().last().copied())
}

/// The directed acyclic graph of lifecycle participants, nodes being
/// service identities and edges going from dependent to dependency.
#[derive(Default)]
pub(crate) struct Graph {
    edges: Mutex<HashMap<Identity, Vec<Identity>>>,
}

impl Graph {
    /// Records `dependent -> dependency`. The caller (the resolver) is
    /// responsible for checking that both ends are lifecycle participants
    /// before calling this, since that check requires a registry lookup the
    /// graph itself doesn't hold.
    pub(crate) fn add_edge(&self, dependent: Identity, dependency: Identity) {
        if dependent == dependency {
            return;
        }
        let mut edges = self.edges.lock().unwrap();
        let deps = edges.entry(dependent).or_default();
        if !deps.contains(&dependency) {
            deps.push(dependency);
        }
    }

    pub(crate) fn edges_snapshot(&self) -> HashMap<Identity, Vec<Identity>> {
        self.edges.lock().unwrap().clone()
    }
}
