use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use faultline::types::Uuid;
use faultline_core::test::with_captured_events;

#[test]
fn test_basic_capture_message() {
    let mut last_event_id = None::<Uuid>;
    let events = with_captured_events(|| {
        faultline::configure_scope(|scope| {
            scope.set_tag("worker", "worker1");
        });
        faultline::capture_message("Hello World!", faultline::Level::Warning);
        last_event_id = faultline::last_event_id();
    });
    assert_eq!(events.len(), 1);
    let event = events.into_iter().next().unwrap();
    assert_eq!(event.message.unwrap(), "Hello World!");
    assert_eq!(event.level, faultline::Level::Warning);
    assert_eq!(
        event.tags.into_iter().collect::<Vec<(String, String)>>(),
        vec![("worker".to_string(), "worker1".to_string())]
    );

    assert_eq!(Some(event.event_id), last_event_id);
}

#[test]
fn test_breadcrumbs() {
    let events = with_captured_events(|| {
        faultline::add_breadcrumb(|| faultline::Breadcrumb {
            ty: "log".into(),
            message: Some("First breadcrumb".into()),
            ..Default::default()
        });
        faultline::add_breadcrumb(faultline::Breadcrumb {
            ty: "log".into(),
            message: Some("Second breadcrumb".into()),
            ..Default::default()
        });
        faultline::add_breadcrumb(|| {
            vec![
                faultline::Breadcrumb {
                    ty: "log".into(),
                    message: Some("Third breadcrumb".into()),
                    ..Default::default()
                },
                faultline::Breadcrumb {
                    ty: "log".into(),
                    message: Some("Fourth breadcrumb".into()),
                    ..Default::default()
                },
            ]
        });
        faultline::add_breadcrumb(|| None);
        faultline::capture_message("Hello World!", faultline::Level::Warning);
    });
    assert_eq!(events.len(), 1);
    let event = events.into_iter().next().unwrap();

    let messages: Vec<_> = event
        .breadcrumbs
        .iter()
        .map(|x| (x.message.as_deref().unwrap(), x.ty.as_str()))
        .collect();
    assert_eq!(
        messages,
        vec![
            ("First breadcrumb", "log"),
            ("Second breadcrumb", "log"),
            ("Third breadcrumb", "log"),
            ("Fourth breadcrumb", "log"),
        ]
    );
}

#[test]
fn test_breadcrumbs_capped_at_add_time() {
    let options = faultline::ClientOptions {
        max_breadcrumbs: 3,
        ..Default::default()
    };
    let events = faultline_core::test::with_captured_events_options(
        || {
            for idx in 0..10 {
                faultline::add_breadcrumb(faultline::Breadcrumb {
                    message: Some(format!("crumb {idx}")),
                    ..Default::default()
                });
            }
            faultline::capture_message("overflow", faultline::Level::Info);
        },
        options,
    );
    assert_eq!(events.len(), 1);
    let messages: Vec<_> = events[0]
        .breadcrumbs
        .iter()
        .map(|x| x.message.as_deref().unwrap())
        .collect();
    // only the newest three survive, oldest first
    assert_eq!(messages, vec!["crumb 7", "crumb 8", "crumb 9"]);
}

#[test]
fn test_breadcrumbs_survive_pushed_scopes() {
    let events = with_captured_events(|| {
        faultline::with_scope(
            |_| {},
            || {
                faultline::add_breadcrumb(faultline::Breadcrumb {
                    message: Some("from inside".into()),
                    ..Default::default()
                });
            },
        );
        faultline::capture_message("after the block", faultline::Level::Info);
    });
    assert_eq!(events.len(), 1);
    // breadcrumbs live on the isolation scope, not on the popped layer
    assert_eq!(events[0].breadcrumbs.len(), 1);
}

#[test]
fn test_before_breadcrumb() {
    let options = faultline::ClientOptions {
        before_breadcrumb: Some(Arc::new(|crumb| {
            if crumb.message.as_deref() == Some("noisy") {
                None
            } else {
                Some(crumb)
            }
        })),
        ..Default::default()
    };
    let events = faultline_core::test::with_captured_events_options(
        || {
            faultline::add_breadcrumb(faultline::Breadcrumb {
                message: Some("noisy".into()),
                ..Default::default()
            });
            faultline::add_breadcrumb(faultline::Breadcrumb {
                message: Some("useful".into()),
                ..Default::default()
            });
            faultline::capture_message("check", faultline::Level::Info);
        },
        options,
    );
    assert_eq!(events[0].breadcrumbs.len(), 1);
    assert_eq!(events[0].breadcrumbs[0].message.as_deref(), Some("useful"));
}

#[test]
fn test_factory() {
    struct CountingTransport(Arc<AtomicUsize>);

    impl faultline::Transport for CountingTransport {
        fn send_envelope(&self, envelope: faultline::Envelope) {
            assert_eq!(envelope.event().unwrap().message.as_deref(), Some("test"));
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let events = Arc::new(AtomicUsize::new(0));

    let events_for_options = events.clone();
    let options = faultline::ClientOptions {
        dsn: "http://foo@example.com/42".parse().ok(),
        transport: Some(Arc::new(
            move |opts: &faultline::ClientOptions,
                  _outcomes: faultline::OutcomeRecorder|
                  -> Arc<dyn faultline::Transport> {
                assert_eq!(opts.dsn.as_ref().unwrap().host(), "example.com");
                Arc::new(CountingTransport(events_for_options.clone()))
            },
        )),
        ..Default::default()
    };

    faultline::Hub::run(
        Arc::new(faultline::Hub::new(
            Some(Arc::new(options.into())),
            Arc::new(Default::default()),
        )),
        || {
            faultline::capture_message("test", faultline::Level::Error);
        },
    );

    assert_eq!(events.load(Ordering::SeqCst), 1);
}

#[test]
fn test_capture_without_client_still_returns_id() {
    let hub = Arc::new(faultline::Hub::new(None, Arc::new(Default::default())));
    faultline::Hub::run(hub, || {
        let id = faultline::capture_message("into the void", faultline::Level::Error);
        assert!(!id.is_nil());
        assert_eq!(faultline::last_event_id(), Some(id));
    });
}
