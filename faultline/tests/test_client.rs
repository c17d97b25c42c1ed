use std::panic;
use std::sync::Arc;

#[test]
fn test_into_client() {
    let c: faultline::Client = faultline::Client::from_config("https://public@example.com/42");
    {
        let dsn = c.dsn().unwrap();
        assert_eq!(dsn.public_key(), "public");
        assert_eq!(dsn.host(), "example.com");
        assert_eq!(dsn.scheme(), faultline::types::Scheme::Https);
        assert_eq!(dsn.project_id(), &faultline::types::ProjectId::new(42));
    }

    let c: faultline::Client = faultline::Client::from_config((
        "https://public@example.com/42",
        faultline::ClientOptions {
            release: Some("foo@1.0".into()),
            ..Default::default()
        },
    ));
    {
        let dsn = c.dsn().unwrap();
        assert_eq!(dsn.public_key(), "public");
        assert_eq!(dsn.host(), "example.com");
        assert_eq!(&c.options().release.as_ref().unwrap(), &"foo@1.0");
    }

    assert!(faultline::Client::from_config(()).options().dsn.is_none());
}

#[test]
fn test_invalid_dsn_disables_client() {
    // not a panic, just an inert client
    let client = faultline::Client::from_config("not even close to a dsn");
    assert!(client.options().dsn.is_none());
    assert!(!client.is_enabled());

    let guard = faultline::init("also not a dsn");
    assert!(!guard.is_enabled());
    // the whole API stays callable
    let id = faultline::capture_message("lost", faultline::Level::Error);
    assert!(!id.is_nil());
}

#[test]
fn test_unwind_safe() {
    let transport = faultline_core::test::TestTransport::new();
    let options = faultline::ClientOptions {
        dsn: Some("https://public@example.com/1".parse().unwrap()),
        transport: Some(Arc::new(transport.clone())),
        ..faultline::ClientOptions::default()
    };

    let client: Arc<faultline::Client> = Arc::new(options.into());

    panic::catch_unwind(|| {
        faultline::Hub::current().bind_client(Some(client));
        faultline::capture_message("Hello World!", faultline::Level::Warning);
    })
    .unwrap();

    faultline::Hub::current().bind_client(None);

    let events = transport.fetch_and_clear_events();

    assert_eq!(events.len(), 1);
}

#[test]
fn test_concurrent_init() {
    let _guard = faultline::init(faultline::ClientOptions {
        ..Default::default()
    });

    std::thread::spawn(|| {
        let _guard = faultline::init(faultline::ClientOptions {
            ..Default::default()
        });
    })
    .join()
    .unwrap();
}

#[test]
fn test_close_is_idempotent() {
    let transport = faultline_core::test::TestTransport::new();
    let options = faultline::ClientOptions {
        dsn: Some("https://public@example.com/1".parse().unwrap()),
        transport: Some(Arc::new(transport.clone())),
        ..Default::default()
    };
    let client = faultline::Client::from_config(options);
    assert!(client.is_enabled());

    assert!(client.close(None));
    assert!(!client.is_enabled());
    // closing again reports success without doing anything
    assert!(client.close(None));

    // captures after close still return ids but send nothing
    let id = client.capture_event(Default::default(), None, None);
    assert!(!id.is_nil());
    assert!(transport.fetch_and_clear_envelopes().is_empty());
}

#[test]
fn test_init_guard_drop_flushes() {
    let transport = faultline_core::test::TestTransport::new();
    {
        let _guard = faultline::init(faultline::ClientOptions {
            dsn: Some("https://public@example.com/1".parse().unwrap()),
            transport: Some(Arc::new(transport.clone())),
            ..Default::default()
        });
        faultline::capture_message("before shutdown", faultline::Level::Error);
    }
    // dropping the guard closed the client and drained the queue
    assert_eq!(transport.fetch_and_clear_events().len(), 1);
    faultline::Hub::current().bind_client(None);
}

#[test]
fn test_sampled_out_events_record_outcomes() {
    let transport = faultline_core::test::TestTransport::new();
    let options = faultline::ClientOptions {
        dsn: Some("https://public@example.com/1".parse().unwrap()),
        transport: Some(Arc::new(transport.clone())),
        sample_rate: 0.0,
        ..Default::default()
    };
    let client = faultline::Client::from_config(options);

    let id = client.capture_event(Default::default(), None, None);
    assert!(!id.is_nil());
    assert!(transport.fetch_and_clear_envelopes().is_empty());

    let report = client.outcomes().flush().expect("a recorded outcome");
    assert_eq!(report.discarded_events.len(), 1);
    assert_eq!(
        report.discarded_events[0].reason,
        faultline::protocol::DiscardReason::SampleRate
    );
    assert_eq!(report.discarded_events[0].quantity, 1);
}
