use ironframe::{Container, Inject};
use proptest::prelude::*;

struct Tagged(usize);
impl Inject for Tagged {}

fn distinct_names() -> impl Strategy<Value = Vec<&'static str>> {
    // A fixed pool of `'static` names; proptest picks a non-empty, duplicate-free
    // subset-with-order to exercise registration/resolution ordering.
    let pool: Vec<&'static str> = vec!["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"];
    let len = pool.len();
    proptest::sample::subsequence(pool, 1..=len)
}

proptest! {
    /// `ResolveAll` always returns bindings in exactly the order they were
    /// registered, regardless of which names or how many.
    #[test]
    fn resolve_all_preserves_registration_order(names in distinct_names()) {
        let container = Container::new();
        for (index, name) in names.iter().enumerate() {
            container
                .register::<Tagged>()
                .named(name)
                .instance(Tagged(index))
                .finish()
                .unwrap();
        }

        let all = container.resolve_all::<Tagged>().unwrap();
        let observed: Vec<usize> = all.iter().map(|t| t.0).collect();
        let expected: Vec<usize> = (0..names.len()).collect();
        prop_assert_eq!(observed, expected);
    }

    /// Registering the same name twice is always rejected, no matter which
    /// name or how many other distinct bindings surround it.
    #[test]
    fn duplicate_name_is_always_rejected(names in distinct_names()) {
        let container = Container::new();
        for name in &names {
            container.register::<Tagged>().named(name).instance(Tagged(0)).finish().unwrap();
        }

        let repeat = names[0];
        let err = container.register::<Tagged>().named(repeat).instance(Tagged(99)).finish();
        prop_assert!(err.is_err());
    }
}
