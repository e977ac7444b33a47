use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ironframe::{Identity, Observer, TracingObserver};

struct CountingObserver {
    resolved: AtomicUsize,
}

impl Observer for CountingObserver {
    fn resolved(&self, _identity: &Identity, _duration: Duration) {
        self.resolved.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn overriding_one_method_leaves_the_rest_on_their_tracing_default() {
    struct Marker;
    let observer = CountingObserver { resolved: AtomicUsize::new(0) };

    observer.resolved(&Identity::of::<Marker>(), Duration::from_millis(1));
    observer.resolving(&Identity::of::<Marker>());
    observer.cycle_detected(&[Identity::of::<Marker>()]);

    assert_eq!(observer.resolved.load(Ordering::SeqCst), 1);
}

#[test]
fn tracing_observer_default_methods_do_not_panic() {
    struct Marker;
    let observer = TracingObserver;
    let id = Identity::of::<Marker>();

    observer.resolving(&id);
    observer.resolved(&id, Duration::from_micros(5));
    observer.cycle_detected(&[id, id]);
    observer.service_started(&id);
    observer.service_stopped(&id);
    observer.worker_failed("w", "boom");
    observer.worker_tripped("w");
}

#[test]
fn tracing_observer_is_shareable_across_threads() {
    let observer: Arc<dyn Observer> = Arc::new(TracingObserver);
    let handle = std::thread::spawn(move || {
        struct Marker;
        observer.resolving(&Identity::of::<Marker>());
    });
    handle.join().unwrap();
}
