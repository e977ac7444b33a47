use ironframe::{Container, DiError, Inject, Lifestyle};

struct A;
impl Inject for A {}
struct B;
impl Inject for B {}

/// Spec scenario 2: A's provider resolves B, B's provider resolves A.
#[test]
fn cross_provider_cycle_is_detected_and_not_cached() {
    let container = Container::new();
    container
        .register::<A>()
        .provider(|c| {
            let _ = c.resolve::<B>()?;
            Ok(A)
        })
        .lifestyle(Lifestyle::Singleton)
        .finish()
        .unwrap();
    container
        .register::<B>()
        .provider(|c| {
            let _ = c.resolve::<A>()?;
            Ok(B)
        })
        .lifestyle(Lifestyle::Singleton)
        .finish()
        .unwrap();

    let err = container.resolve::<A>().unwrap_err();
    let DiError::Cycle(chain) = err else {
        panic!("expected DiError::Cycle, got {err:?}");
    };
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[0], chain[2], "chain must close the loop on the same identity");

    // A cycle must never populate the cache on either side: resolving B
    // directly afterward re-enters A's provider (and fails the same way)
    // rather than returning a stale cached value.
    let second = container.resolve::<B>().unwrap_err();
    assert!(matches!(second, DiError::Cycle(_)));
}

#[test]
fn self_referential_provider_is_a_cycle_of_one() {
    struct Loop;
    impl Inject for Loop {}

    let container = Container::new();
    container
        .register::<Loop>()
        .provider(|c| {
            let _ = c.resolve::<Loop>()?;
            Ok(Loop)
        })
        .finish()
        .unwrap();

    let err = container.resolve::<Loop>().unwrap_err();
    assert!(matches!(err, DiError::Cycle(_)));
}
