//! Field-tag injection (spec.md §6 "Field-Injection Tag Grammar").
//!
//! Go-style runtime struct tags (`inject`, `inject,optional`,
//! `inject,name=X`, `inject,name=X,optional`) have no Rust equivalent at
//! runtime, so the grammar is realized as a compile-time `#[derive(Inject)]`
//! macro (see `ironframe-derive`) that emits an implementation of this
//! trait. The resolver calls [`Inject::inject_fields`] on any freshly
//! constructed, non-Instance value whose type implements it; types that
//! don't implement `Inject` are left untouched ("non-structure results skip
//! injection silently").

use crate::container::Container;
use crate::error::DiResult;

pub trait Inject {
    /// Resolves and assigns every field tagged `#[inject]`, using `container`
    /// to satisfy each dependency. Called once, immediately after
    /// construction and before the value is wrapped in its cache `Arc`.
    ///
    /// Types with nothing to inject get this default no-op; `#[derive(Inject)]`
    /// overrides it for structs carrying `#[inject]`-tagged fields. Every
    /// type registered as a provider result must implement `Inject` (even if
    /// trivially, via `impl Inject for T {}`) so the resolver has a uniform
    /// post-construction hook to call.
    fn inject_fields(&mut self, container: &Container) -> DiResult<()> {
        let _ = container;
        Ok(())
    }
}
