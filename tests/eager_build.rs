use ironframe::{Container, DiError, Identity, Inject, Lifestyle};

struct Cfg;
impl Inject for Cfg {}

/// Spec scenario 3: an Eager provider's failure surfaces from `build()`
/// wrapped with the failing service's identity.
#[test]
fn eager_failure_surfaces_with_service_name() {
    let container = Container::new();
    container
        .register::<Cfg>()
        .provider(|_| Err(DiError::Provider(Identity::of::<Cfg>(), "bad addr".into())))
        .lifestyle(Lifestyle::Eager)
        .finish()
        .unwrap();

    let err = container.build().unwrap_err();
    let DiError::BuildFailed { service, source } = &err else {
        panic!("expected DiError::BuildFailed, got {err:?}");
    };
    assert_eq!(*service, Identity::of::<Cfg>());
    assert!(source.to_string().contains("bad addr"));
    assert!(err.to_string().contains("bad addr"));
}

#[test]
fn build_is_idempotent_and_does_not_reinvoke_eager_providers() {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Counter;
    impl Inject for Counter {}

    let calls = Arc::new(AtomicU32::new(0));
    let calls_for_provider = calls.clone();
    let container = Container::new();
    container
        .register::<Counter>()
        .provider(move |_| {
            calls_for_provider.fetch_add(1, Ordering::SeqCst);
            Ok(Counter)
        })
        .lifestyle(Lifestyle::Eager)
        .finish()
        .unwrap();

    container.build().unwrap();
    container.build().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
