use std::sync::Arc;

use ironframe::{Container, DiError, Inject, Lifestyle};

#[derive(Default)]
struct Database {
    conn: String,
}
impl Inject for Database {}

#[derive(Default)]
struct Logger {
    level: String,
}
impl Inject for Logger {}

#[derive(Default, ironframe::Inject)]
struct Handler {
    #[inject]
    db: Arc<Database>,
    #[inject]
    logger: Arc<Logger>,
}

/// Spec scenario 1: instance bindings plus field-tag injection, with the
/// handler itself resolving as a singleton.
#[test]
fn resolves_and_injects_dependencies() {
    let container = Container::new();
    container
        .register::<Database>()
        .instance(Database { conn: "pg".into() })
        .finish()
        .unwrap();
    container
        .register::<Logger>()
        .instance(Logger { level: "info".into() })
        .finish()
        .unwrap();
    container
        .register::<Handler>()
        .provider(|_| Ok(Handler::default()))
        .lifestyle(Lifestyle::Singleton)
        .finish()
        .unwrap();
    container.build().unwrap();

    let handler1 = container.resolve::<Handler>().unwrap();
    assert_eq!(handler1.db.conn, "pg");
    assert_eq!(handler1.logger.level, "info");

    let handler2 = container.resolve::<Handler>().unwrap();
    assert!(Arc::ptr_eq(&handler1, &handler2));

    let db = container.resolve::<Database>().unwrap();
    assert!(Arc::ptr_eq(&handler1.db, &db));
}

#[test]
fn instance_round_trip_returns_identity_not_copy() {
    let container = Container::new();
    container.register::<Database>().instance(Database { conn: "pg".into() }).finish().unwrap();

    let a = container.resolve::<Database>().unwrap();
    let b = container.resolve::<Database>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn transient_creates_a_new_instance_every_resolution() {
    struct Token(u32);
    impl Inject for Token {}

    let counter = std::sync::atomic::AtomicU32::new(0);
    let container = Container::new();
    container
        .register::<Token>()
        .provider(move |_| Ok(Token(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))))
        .lifestyle(Lifestyle::Transient)
        .finish()
        .unwrap();

    let first = container.resolve::<Token>().unwrap();
    let second = container.resolve::<Token>().unwrap();
    assert_ne!(first.0, second.0);
}

#[test]
fn has_reports_registered_bindings_only() {
    let container = Container::new();
    assert!(!container.has::<Database>());
    container.register::<Database>().instance(Database::default()).finish().unwrap();
    assert!(container.has::<Database>());
}

#[test]
fn resolve_all_returns_every_binding_in_registration_order() {
    struct Plugin(&'static str);
    impl Inject for Plugin {}

    let container = Container::new();
    container.register::<Plugin>().named("first").instance(Plugin("first")).finish().unwrap();
    container.register::<Plugin>().named("second").instance(Plugin("second")).finish().unwrap();
    container.register::<Plugin>().instance(Plugin("default")).finish().unwrap();

    let all = container.resolve_all::<Plugin>().unwrap();
    let names: Vec<&str> = all.iter().map(|p| p.0).collect();
    assert_eq!(names, vec!["first", "second", "default"]);
}

#[test]
fn duplicate_registration_is_rejected() {
    let container = Container::new();
    container.register::<Database>().instance(Database::default()).finish().unwrap();
    let err = container.register::<Database>().instance(Database::default()).finish().unwrap_err();
    assert!(matches!(err, DiError::DuplicateRegistration(_)));
}

#[test]
fn hooks_on_transient_binding_are_rejected_at_registration() {
    struct Job;
    impl Inject for Job {}

    let container = Container::new();
    let err = container
        .register::<Job>()
        .provider(|_| Ok(Job))
        .lifestyle(Lifestyle::Transient)
        .on_start(|_v, _ctx| async { Ok(()) })
        .finish()
        .unwrap_err();
    assert!(matches!(err, DiError::InvalidHookPlacement(_)));
}

#[test]
fn resolving_an_unregistered_type_is_not_found() {
    let container = Container::new();
    let err = container.resolve::<Database>().unwrap_err();
    assert!(matches!(err, DiError::NotFound(_)));
}
