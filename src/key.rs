//! Type identity for the dependency injection container.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The comparable key under which a [`crate::descriptor::Descriptor`] is filed:
/// a type identity plus an optional disambiguating name.
///
/// `(T, None)` is the default binding for `T`; `(T, Some(name))` is a named
/// binding. Parameterized types (`Foo<Bar>`) get distinct `TypeId`s from the
/// language itself, so they are distinct identities without any extra key
/// function.
#[derive(Clone, Copy, Eq)]
pub struct Identity {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<&'static str>,
}

impl Identity {
    /// Builds the identity for `T` with no name.
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: None,
        }
    }

    /// Builds the identity for `T` disambiguated by `name`.
    pub fn named<T: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: Some(name),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(n) => write!(f, "{}[{}]", self.type_name, n),
            None => write!(f, "{}", self.type_name),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_and_named_bindings_of_the_same_type_are_distinct_identities() {
        let unnamed = Identity::of::<String>();
        let named = Identity::named::<String>("primary");
        assert_ne!(unnamed, named);
        assert_eq!(unnamed.type_id(), named.type_id());
    }

    #[test]
    fn same_type_and_name_compare_equal_and_hash_equal() {
        use std::collections::HashSet;
        let a = Identity::named::<u32>("count");
        let b = Identity::named::<u32>("count");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn distinct_types_never_compare_equal() {
        assert_ne!(Identity::of::<u32>(), Identity::of::<u64>());
    }

    #[test]
    fn debug_includes_the_name_only_when_present() {
        let unnamed = Identity::of::<u32>();
        let named = Identity::named::<u32>("primary");
        assert!(!format!("{unnamed:?}").contains('['));
        assert!(format!("{named:?}").contains("[primary]"));
    }
}
