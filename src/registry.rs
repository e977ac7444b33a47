//! Type Registry: the map from (type identity, optional name) to descriptor.
//!
//! Mutable only before `Container::build()`; frozen (read-only) afterward,
//! per spec.md §5 "Shared-resource policy".
//!
//! Descriptors are stored behind `Arc` so a caller can clone one out of the
//! registry and drop the registry lock before invoking its provider. This
//! matters because a provider may itself call back into the container for a
//! nested resolution (spec.md 4.C step 7/9); holding a `RwLock` read guard
//! across that nested call would risk a self-deadlock on platforms whose
//! native rwlock isn't read-reentrant.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::Descriptor;
use crate::error::{DiError, DiResult};
use crate::key::Identity;

#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<Identity, Arc<Descriptor>>,
    /// Registration order, preserved for `ResolveAll` and for the
    /// deterministic tie-breaking spec.md §9 mandates in topological sort.
    order: Vec<Identity>,
}

impl Registry {
    pub(crate) fn insert(&mut self, descriptor: Descriptor) -> DiResult<()> {
        let identity = descriptor.identity;
        if self.entries.contains_key(&identity) {
            return Err(DiError::DuplicateRegistration(identity));
        }
        self.order.push(identity);
        self.entries.insert(identity, Arc::new(descriptor));
        Ok(())
    }

    pub(crate) fn get(&self, identity: &Identity) -> Option<Arc<Descriptor>> {
        self.entries.get(identity).cloned()
    }

    pub(crate) fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    /// All descriptors bound to `type_id`, regardless of name, in
    /// registration order. Backs `ResolveAll<T>`.
    pub(crate) fn all_for_type(&self, type_id: TypeId) -> Vec<Arc<Descriptor>> {
        self.order
            .iter()
            .filter(|id| id.type_id() == type_id)
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub(crate) fn registration_index(&self, identity: &Identity) -> Option<usize> {
        self.order.iter().position(|id| id == identity)
    }
}
