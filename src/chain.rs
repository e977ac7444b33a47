//! Per-invocation resolution chain and cycle detection.
//!
//! Grounded on the donor crate's `internal/circular.rs`: a thread-local stack
//! of identities currently under construction, guarded by an RAII stack guard
//! so a panic unwinding through `resolve` still pops correctly, with the
//! cycle itself signalled via `panic_any` and caught at the top-level
//! `resolve` boundary. This realizes spec.md §9 strategy (a): "Associate the
//! chain with the logical task invoking Resolve (task-local storage)."
//!
//! A plain thread-local (rather than a tokio task-local) is sufficient here
//! because resolution never yields across an `.await` point: providers run
//! to completion synchronously within a single `resolve` call, exactly like
//! the donor crate's resolvers do.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use crate::error::DiError;
use crate::key::Identity;

const MAX_DEPTH: usize = 512;

thread_local! {
    static CHAIN: RefCell<Vec<Identity>> = RefCell::new(Vec::new());
}

/// Payload used to unwind out of arbitrarily deep provider nesting the
/// instant a cycle is detected, rather than threading a `Result` through
/// every nested closure call.
struct CyclePanic(Vec<Identity>);

/// RAII guard: pushes `id` onto the thread-local chain on construction,
/// pops it on drop. Panics (via `panic_any`) if `id` is already on the chain.
struct ChainGuard {
    popped: bool,
}

impl ChainGuard {
    fn enter(id: Identity) -> Self {
        CHAIN.with(|chain| {
            let mut chain = chain.borrow_mut();
            if chain.len() >= MAX_DEPTH {
                // Runaway recursion that isn't a literal cycle (e.g. unbounded
                // provider recursion); treat the current chain as the cycle
                // evidence since any deeper nesting is pathological.
                panic::panic_any(CyclePanic(chain.clone()));
            }
            if chain.contains(&id) {
                let mut cycle = chain.clone();
                cycle.push(id);
                panic::panic_any(CyclePanic(cycle));
            }
            chain.push(id);
        });
        ChainGuard { popped: false }
    }
}

impl Drop for ChainGuard {
    fn drop(&mut self) {
        if !self.popped {
            CHAIN.with(|chain| {
                chain.borrow_mut().pop();
            });
        }
    }
}

/// Runs `f` with `id` pushed onto the current resolution chain, catching a
/// cycle panic raised by a nested call and converting it into
/// [`DiError::Cycle`]. Any ordinary panic from `f` itself propagates
/// unchanged.
pub fn with_chain<T>(id: Identity, f: impl FnOnce() -> Result<T, DiError>) -> Result<T, DiError> {
    let guard = ChainGuard::enter(id);
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    drop(guard);

    match result {
        Ok(inner) => inner,
        Err(payload) => match payload.downcast::<CyclePanic>() {
            Ok(cycle) => Err(DiError::Cycle(cycle.0)),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Returns a snapshot of the current thread's resolution chain, for
/// diagnostics or for tests asserting ordering.
pub fn current_chain() -> Vec<Identity> {
    CHAIN.with(|chain| chain.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn nested_with_chain_calls_leave_the_thread_local_empty_on_success() {
        let result = with_chain(Identity::of::<A>(), || {
            with_chain(Identity::of::<B>(), || Ok(()))
        });
        assert!(result.is_ok());
        assert!(current_chain().is_empty());
    }

    #[test]
    fn re_entering_the_same_identity_is_a_cycle_and_clears_the_chain() {
        let result: Result<(), DiError> = with_chain(Identity::of::<A>(), || {
            with_chain(Identity::of::<A>(), || Ok(()))
        });
        assert!(matches!(result, Err(DiError::Cycle(_))));
        assert!(current_chain().is_empty(), "a detected cycle must not leak onto the chain");
    }

    #[test]
    fn an_ordinary_panic_inside_f_is_not_mistaken_for_a_cycle() {
        let result = std::panic::catch_unwind(|| {
            with_chain(Identity::of::<A>(), || -> Result<(), DiError> {
                panic!("not a cycle");
            })
        });
        assert!(result.is_err());
        assert!(current_chain().is_empty());
    }
}
