use faultline::protocol::{EnvelopeItem, Transaction, Value};
use faultline_core::test::with_captured_envelopes_options;

fn transactions(envelopes: &[faultline::Envelope]) -> Vec<Transaction> {
    envelopes
        .iter()
        .flat_map(|envelope| envelope.items())
        .filter_map(|item| match item {
            EnvelopeItem::Transaction(transaction) => Some(transaction.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_sampled_transaction_is_sent() {
    let options = faultline::ClientOptions {
        traces_sample_rate: 1.0,
        release: Some("myapp@1.0.0".into()),
        ..Default::default()
    };
    let envelopes = with_captured_envelopes_options(
        || {
            faultline::configure_scope(|scope| scope.set_tag("worker", "worker1"));

            let ctx = faultline::TransactionContext::new("honk-processing", "task");
            let transaction = faultline::start_transaction(ctx);
            transaction.set_data("goose-count", Value::from(7));

            let span = transaction.start_child("db.query", "SELECT * FROM geese");
            span.set_status("ok");
            span.finish();

            transaction.set_status("ok");
            transaction.finish();
        },
        options,
    );

    let transactions = transactions(&envelopes);
    assert_eq!(transactions.len(), 1);
    let transaction = &transactions[0];

    assert_eq!(transaction.name.as_deref(), Some("honk-processing"));
    assert_eq!(transaction.release.as_deref(), Some("myapp@1.0.0"));
    assert!(transaction.timestamp.is_some());
    assert_eq!(transaction.extra["goose-count"], Value::from(7));

    // scope data was applied on finish
    assert_eq!(transaction.tags.get("worker").map(String::as_str), Some("worker1"));

    let trace = transaction.contexts.get("trace").expect("trace context");
    assert_eq!(trace["op"], Value::from("task"));
    assert_eq!(trace["status"], Value::from("ok"));

    assert_eq!(transaction.spans.len(), 1);
    let span = &transaction.spans[0];
    assert_eq!(span.op.as_deref(), Some("db.query"));
    assert_eq!(span.description.as_deref(), Some("SELECT * FROM geese"));
    assert_eq!(span.status.as_deref(), Some("ok"));
    assert!(span.timestamp.is_some());
}

#[test]
fn test_unsampled_transaction_is_discarded() {
    let envelopes = with_captured_envelopes_options(
        || {
            let ctx = faultline::TransactionContext::new("unsampled", "task");
            let transaction = faultline::start_transaction(ctx);
            transaction.start_child("child", "").finish();
            transaction.finish();
        },
        faultline::ClientOptions {
            traces_sample_rate: 0.0,
            ..Default::default()
        },
    );
    assert!(transactions(&envelopes).is_empty());
}

#[test]
fn test_explicit_sampling_decision_wins() {
    let envelopes = with_captured_envelopes_options(
        || {
            let mut ctx = faultline::TransactionContext::new("forced", "task");
            ctx.set_sampled(true);
            faultline::start_transaction(ctx).finish();

            let mut ctx = faultline::TransactionContext::new("suppressed", "task");
            ctx.set_sampled(false);
            faultline::start_transaction(ctx).finish();
        },
        faultline::ClientOptions {
            traces_sample_rate: 0.0,
            ..Default::default()
        },
    );
    let transactions = transactions(&envelopes);
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].name.as_deref(), Some("forced"));
}

#[test]
fn test_span_on_scope_stamps_events() {
    let envelopes = with_captured_envelopes_options(
        || {
            let ctx = faultline::TransactionContext::new("with-event", "task");
            let transaction = faultline::start_transaction(ctx);
            faultline::configure_scope(|scope| {
                scope.set_span(Some(transaction.clone().into()));
            });

            faultline::capture_message("inside transaction", faultline::Level::Error);

            faultline::configure_scope(|scope| scope.set_span(None));
            transaction.finish();
        },
        faultline::ClientOptions {
            traces_sample_rate: 1.0,
            ..Default::default()
        },
    );

    let event = envelopes
        .iter()
        .find_map(|envelope| envelope.event())
        .expect("an event");
    let transaction = &transactions(&envelopes)[0];

    // the event's trace context points at the running transaction
    let event_trace = event.contexts.get("trace").expect("trace context");
    let transaction_trace = transaction.contexts.get("trace").expect("trace context");
    assert_eq!(event_trace["trace_id"], transaction_trace["trace_id"]);
}

#[test]
fn test_continue_from_span_joins_the_trace() {
    let options = faultline::ClientOptions {
        traces_sample_rate: 1.0,
        ..Default::default()
    };
    let envelopes = with_captured_envelopes_options(
        || {
            let ctx = faultline::TransactionContext::new("parent", "task");
            let parent = faultline::start_transaction(ctx);

            let ctx = faultline::TransactionContext::continue_from_span(
                "worker",
                "task",
                Some(parent.clone().into()),
            );
            faultline::start_transaction(ctx).finish();
            parent.finish();
        },
        options,
    );
    let transactions = transactions(&envelopes);
    assert_eq!(transactions.len(), 2);

    let worker_trace = transactions[0].contexts.get("trace").unwrap();
    let parent_trace = transactions[1].contexts.get("trace").unwrap();
    assert_eq!(worker_trace["trace_id"], parent_trace["trace_id"]);
    assert_eq!(worker_trace["parent_span_id"], parent_trace["span_id"]);
}
