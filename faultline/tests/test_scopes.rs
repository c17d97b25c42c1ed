use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use faultline_core::test::{with_captured_events, with_captured_events_options};

#[test]
fn test_with_scope_restores_previous_data() {
    let events = with_captured_events(|| {
        faultline::configure_scope(|scope| scope.set_tag("outer", "yes"));
        faultline::with_scope(
            |scope| {
                scope.set_tag("inner", "yes");
                scope.set_level(Some(faultline::Level::Warning));
            },
            || faultline::capture_message("inside", faultline::Level::Info),
        );
        faultline::capture_message("outside", faultline::Level::Info);
    });
    assert_eq!(events.len(), 2);

    let inside = &events[0];
    assert_eq!(inside.level, faultline::Level::Warning);
    assert_eq!(inside.tags.get("outer").map(String::as_str), Some("yes"));
    assert_eq!(inside.tags.get("inner").map(String::as_str), Some("yes"));

    let outside = &events[1];
    assert_eq!(outside.level, faultline::Level::Info);
    assert!(!outside.tags.contains_key("inner"));
}

#[test]
fn test_with_isolation_scope_is_contained() {
    let events = with_captured_events(|| {
        faultline::configure_isolation_scope(|scope| scope.set_tag("tier", "outer"));
        faultline::with_isolation_scope(
            |scope| scope.set_tag("job", "cleanup"),
            || {
                faultline::add_breadcrumb(faultline::Breadcrumb {
                    message: Some("inside only".into()),
                    ..Default::default()
                });
                faultline::capture_message("inside", faultline::Level::Error);
            },
        );
        faultline::capture_message("outside", faultline::Level::Error);
    });
    assert_eq!(events.len(), 2);

    // the fork started from the outer data and added its own
    assert_eq!(events[0].tags.get("tier").map(String::as_str), Some("outer"));
    assert_eq!(events[0].tags.get("job").map(String::as_str), Some("cleanup"));
    assert_eq!(events[0].breadcrumbs.len(), 1);

    // nothing recorded inside leaked back out
    assert!(!events[1].tags.contains_key("job"));
    assert!(events[1].breadcrumbs.is_empty());
}

#[test]
fn test_event_data_wins_over_scope() {
    let events = with_captured_events(|| {
        faultline::configure_scope(|scope| {
            scope.set_user(Some(faultline::User {
                username: Some("scope-user".into()),
                ..Default::default()
            }));
            scope.set_extra("shared", "from-scope".into());
        });
        faultline::capture_event(faultline::protocol::Event {
            user: Some(faultline::User {
                username: Some("event-user".into()),
                ..Default::default()
            }),
            extra: {
                let mut map = faultline::protocol::Map::new();
                map.insert("shared".into(), "from-event".into());
                map
            },
            ..Default::default()
        });
    });
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(
        event.user.as_ref().unwrap().username.as_deref(),
        Some("event-user")
    );
    assert_eq!(
        event.extra["shared"],
        faultline::protocol::Value::from("from-event")
    );
}

#[test]
fn test_processor_order_and_short_circuit() {
    let order = Arc::new(AtomicUsize::new(0));

    let isolation_order = order.clone();
    let current_order = order.clone();
    let events = with_captured_events(|| {
        faultline::configure_isolation_scope(|scope| {
            scope.add_event_processor(move |event| {
                // isolation processors run before current scope processors
                assert_eq!(isolation_order.fetch_add(1, Ordering::SeqCst), 0);
                Some(event)
            });
        });
        faultline::configure_scope(|scope| {
            scope.add_event_processor(move |_event| {
                assert_eq!(current_order.fetch_add(1, Ordering::SeqCst), 1);
                None
            });
            scope.add_event_processor(|_event| {
                panic!("short-circuit means this never runs");
            });
        });
        faultline::capture_message("dropped", faultline::Level::Error);
    });
    assert!(events.is_empty());
    assert_eq!(order.load(Ordering::SeqCst), 2);
}

#[test]
fn test_processor_panic_passes_event_through() {
    let events = with_captured_events(|| {
        faultline::configure_scope(|scope| {
            scope.add_event_processor(|mut event| {
                event.message = Some("first".into());
                Some(event)
            });
            scope.add_event_processor(|_event| -> Option<faultline::protocol::Event> {
                panic!("bad processor");
            });
            scope.add_event_processor(|mut event| {
                // still sees the result of the first processor
                assert_eq!(event.message.as_deref(), Some("first"));
                event.message = Some("third".into());
                Some(event)
            });
        });
        faultline::capture_message("initial", faultline::Level::Error);
    });
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message.as_deref(), Some("third"));
}

#[test]
fn test_before_send_drops_event() {
    let options = faultline::ClientOptions {
        before_send: Some(Arc::new(|event| {
            if event.message.as_deref() == Some("secret") {
                None
            } else {
                Some(event)
            }
        })),
        ..Default::default()
    };
    let events = with_captured_events_options(
        || {
            faultline::capture_message("secret", faultline::Level::Error);
            faultline::capture_message("public", faultline::Level::Error);
        },
        options,
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message.as_deref(), Some("public"));
}

#[test]
fn test_cross_thread_isolation() {
    let events = with_captured_events(|| {
        faultline::configure_isolation_scope(|scope| scope.set_tag("thread", "main"));

        let hub = Arc::new(faultline::Hub::new_from_top(faultline::Hub::current()));
        std::thread::spawn(move || {
            faultline::Hub::run(hub, || {
                // the fork starts with the parent's data
                faultline::configure_isolation_scope(|scope| {
                    scope.set_tag("thread", "worker");
                });
                faultline::capture_message("from worker", faultline::Level::Error);
            })
        })
        .join()
        .unwrap();

        faultline::capture_message("from main", faultline::Level::Error);
    });
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].tags.get("thread").map(String::as_str),
        Some("worker")
    );
    assert_eq!(
        events[1].tags.get("thread").map(String::as_str),
        Some("main")
    );
}

#[test]
fn test_propagation_context_stamped_on_events() {
    let events = with_captured_events(|| {
        faultline::capture_message("one", faultline::Level::Info);
        faultline::capture_message("two", faultline::Level::Info);
    });
    assert_eq!(events.len(), 2);

    let trace_of = |event: &faultline::protocol::Event| {
        let trace = event.contexts.get("trace").expect("trace context");
        trace["trace_id"].clone()
    };

    // both events of the unit of work share one trace id
    assert_eq!(trace_of(&events[0]), trace_of(&events[1]));
}
