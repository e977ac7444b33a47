//! Instantiation and caching policy of a binding.

/// Instantiation and caching policy of a binding. See `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifestyle {
    /// First resolution creates; subsequent resolutions share the instance.
    Singleton,
    /// Created during `Container::build()`, not on first resolution.
    Eager,
    /// A new instance is constructed on every resolution; never cached.
    Transient,
    /// A pre-constructed value. No provider is ever invoked and field
    /// injection is never applied.
    Instance,
}

impl Lifestyle {
    /// Singleton and Eager share the same caching semantics once built;
    /// they differ only in *when* the first construction happens.
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifestyle::Singleton | Lifestyle::Eager | Lifestyle::Instance)
    }

    pub fn is_eager(&self) -> bool {
        matches!(self, Lifestyle::Eager)
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, Lifestyle::Instance)
    }
}

impl Default for Lifestyle {
    fn default() -> Self {
        Lifestyle::Singleton
    }
}
