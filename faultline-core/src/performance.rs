use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::protocol::{self, DataCategory, DiscardReason, SpanId, TraceId};
use crate::{Client, Envelope, Hub};

const MAX_SPANS: usize = 1_000;

/// The tracing ids every scope carries from birth.
///
/// Events captured while no span is active get these ids stamped into their
/// `trace` context, so that events from the same unit of work can be
/// correlated even without performance monitoring.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PropagationContext {
    /// The id of the current trace.
    pub trace_id: TraceId,
    /// The id standing in for the current span.
    pub span_id: SpanId,
}

// global API:

/// Start a new performance monitoring transaction.
///
/// The transaction needs to be explicitly finished via
/// [`Transaction::finish`], otherwise it will be discarded.  The transaction
/// itself also represents the root span in the span hierarchy.  Child spans
/// can be started with the [`Transaction::start_child`] method.
pub fn start_transaction(ctx: TransactionContext) -> Transaction {
    let client = Hub::with_active(|hub| hub.client());
    Transaction::new(client, ctx)
}

// Hub API:

impl Hub {
    /// Start a new performance monitoring transaction.
    ///
    /// See the global [`start_transaction`] for more documentation.
    pub fn start_transaction(&self, ctx: TransactionContext) -> Transaction {
        Transaction::new(self.client(), ctx)
    }
}

// "Context" Types:

/// The transaction context used to start a new performance monitoring
/// transaction.
#[derive(Debug)]
pub struct TransactionContext {
    name: String,
    op: String,
    trace_id: TraceId,
    parent_span_id: Option<SpanId>,
    sampled: Option<bool>,
}

impl TransactionContext {
    /// Creates a new transaction context with the given `name` and `op`.
    #[must_use = "this must be used with `start_transaction`"]
    pub fn new(name: &str, op: &str) -> Self {
        Self {
            name: name.into(),
            op: op.into(),
            trace_id: TraceId::default(),
            parent_span_id: None,
            sampled: None,
        }
    }

    /// Creates a new transaction context based on an existing span.
    ///
    /// This should be used when an independent computation is spawned on
    /// another thread and should be connected to the calling thread via the
    /// same trace.
    pub fn continue_from_span(name: &str, op: &str, span: Option<TransactionOrSpan>) -> Self {
        let span = match span {
            Some(span) => span,
            None => return Self::new(name, op),
        };

        let (trace_id, parent_span_id, sampled) = match span {
            TransactionOrSpan::Transaction(transaction) => {
                let inner = transaction
                    .inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                (
                    inner.context.trace_id,
                    inner.context.span_id,
                    Some(inner.sampled),
                )
            }
            TransactionOrSpan::Span(span) => {
                let sampled = span.sampled;
                let span = span.span.lock().unwrap_or_else(PoisonError::into_inner);
                (span.trace_id, span.span_id, Some(sampled))
            }
        };

        Self {
            name: name.into(),
            op: op.into(),
            trace_id,
            parent_span_id: Some(parent_span_id),
            sampled,
        }
    }

    /// Set the sampling decision for this transaction.
    ///
    /// This can be either an explicit boolean flag, or [`None`], which will
    /// fall back to the configured `traces_sample_rate` option.
    pub fn set_sampled(&mut self, sampled: impl Into<Option<bool>>) {
        self.sampled = sampled.into();
    }
}

// global API types:

/// A wrapper that groups a [`Transaction`] and a [`Span`] together.
#[derive(Clone, Debug)]
pub enum TransactionOrSpan {
    /// A [`Transaction`].
    Transaction(Transaction),
    /// A [`Span`].
    Span(Span),
}

impl From<Transaction> for TransactionOrSpan {
    fn from(transaction: Transaction) -> Self {
        Self::Transaction(transaction)
    }
}

impl From<Span> for TransactionOrSpan {
    fn from(span: Span) -> Self {
        Self::Span(span)
    }
}

impl TransactionOrSpan {
    /// Set some extra information to be sent with this transaction/span.
    pub fn set_data(&self, key: &str, value: protocol::Value) {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.set_data(key, value),
            TransactionOrSpan::Span(span) => span.set_data(key, value),
        }
    }

    /// Get the status of the transaction/span.
    pub fn get_status(&self) -> Option<String> {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.get_status(),
            TransactionOrSpan::Span(span) => span.get_status(),
        }
    }

    /// Set the status of the transaction/span.
    pub fn set_status(&self, status: &str) {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.set_status(status),
            TransactionOrSpan::Span(span) => span.set_status(status),
        }
    }

    /// Starts a new child span with the given `op` and `description`.
    ///
    /// The span must be explicitly finished via [`Span::finish`], as it will
    /// otherwise not be sent.
    #[must_use = "a span must be explicitly closed via `finish()`"]
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.start_child(op, description),
            TransactionOrSpan::Span(span) => span.start_child(op, description),
        }
    }

    pub(crate) fn apply_to_event(&self, event: &mut protocol::Event) {
        if event.contexts.contains_key("trace") {
            return;
        }

        let context = match self {
            TransactionOrSpan::Transaction(transaction) => transaction
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .context
                .clone(),
            TransactionOrSpan::Span(span) => {
                let span = span.span.lock().unwrap_or_else(PoisonError::into_inner);
                protocol::TraceContext {
                    span_id: span.span_id,
                    trace_id: span.trace_id,
                    ..Default::default()
                }
            }
        };
        event.contexts.insert("trace".into(), context.into());
    }

    /// Finishes the transaction/span.
    ///
    /// This records the end timestamp and either sends the inner
    /// [`Transaction`] directly to the relay, or adds the [`Span`] to its
    /// transaction.
    pub fn finish(self) {
        match self {
            TransactionOrSpan::Transaction(transaction) => transaction.finish(),
            TransactionOrSpan::Span(span) => span.finish(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TransactionInner {
    client: Option<Arc<Client>>,
    sampled: bool,
    context: protocol::TraceContext,
    pub(crate) transaction: Option<protocol::Transaction>,
}

type TransactionArc = Arc<Mutex<TransactionInner>>;

/// A running performance monitoring transaction.
///
/// The transaction needs to be explicitly finished via
/// [`Transaction::finish`], otherwise neither the transaction nor any of its
/// child spans will be sent.
#[derive(Clone, Debug)]
pub struct Transaction {
    pub(crate) inner: TransactionArc,
}

impl Transaction {
    fn new(mut client: Option<Arc<Client>>, ctx: TransactionContext) -> Self {
        let context = protocol::TraceContext {
            trace_id: ctx.trace_id,
            parent_span_id: ctx.parent_span_id,
            op: Some(ctx.op),
            ..Default::default()
        };

        let (sampled, mut transaction) = match client.as_ref() {
            Some(client) => (
                ctx.sampled.unwrap_or_else(|| {
                    client.sample_should_send(client.options().traces_sample_rate)
                }),
                Some(protocol::Transaction {
                    name: Some(ctx.name),
                    ..Default::default()
                }),
            ),
            None => (ctx.sampled.unwrap_or(false), None),
        };

        // throw away the transaction here, which means there is nothing to
        // send on `finish`
        if !sampled {
            if let Some(client) = client.as_ref() {
                client
                    .outcomes()
                    .record(DiscardReason::SampleRate, DataCategory::Transaction);
            }
            transaction = None;
            client = None;
        }

        Self {
            inner: Arc::new(Mutex::new(TransactionInner {
                client,
                sampled,
                context,
                transaction,
            })),
        }
    }

    /// Set some extra information to be sent with this transaction.
    pub fn set_data(&self, key: &str, value: protocol::Value) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(transaction) = inner.transaction.as_mut() {
            transaction.extra.insert(key.into(), value);
        }
    }

    /// Get the status of the transaction.
    pub fn get_status(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.context.status.clone()
    }

    /// Set the status of the transaction.
    pub fn set_status(&self, status: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.context.status = Some(status.into());
    }

    /// Finishes the transaction.
    ///
    /// This records the end timestamp and sends the transaction together
    /// with all finished child spans to the relay.  The data of the current
    /// hub's scope tiers is applied before sending.
    pub fn finish(self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut transaction) = inner.transaction.take() {
            if let Some(client) = inner.client.take() {
                transaction.timestamp = Some(SystemTime::now());
                transaction
                    .contexts
                    .insert("trace".into(), inner.context.clone().into());
                drop(inner);

                Hub::with_active(|hub| {
                    hub.with_isolation_scope_ref(|scope| {
                        scope.apply_to_transaction(&mut transaction)
                    });
                    hub.with_current_scope(|scope| scope.apply_to_transaction(&mut transaction));
                });

                let opts = client.options();
                if transaction.release.is_none() {
                    transaction.release = opts.release.as_ref().map(|r| r.to_string());
                }
                if transaction.environment.is_none() {
                    transaction.environment = opts.environment.as_ref().map(|e| e.to_string());
                }
                transaction.sdk = Some(client.sdk_info.clone());

                let mut envelope = Envelope::new();
                envelope.add_item(transaction);
                client.send_envelope(envelope)
            }
        }
    }

    /// Starts a new child span with the given `op` and `description`.
    ///
    /// The span must be explicitly finished via [`Span::finish`].
    #[must_use = "a span must be explicitly closed via `finish()`"]
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let span = protocol::Span {
            trace_id: inner.context.trace_id,
            parent_span_id: Some(inner.context.span_id),
            op: Some(op.into()),
            description: if description.is_empty() {
                None
            } else {
                Some(description.into())
            },
            ..Default::default()
        };
        Span {
            transaction: Arc::clone(&self.inner),
            sampled: inner.sampled,
            span: Arc::new(Mutex::new(span)),
        }
    }
}

/// A running performance monitoring span.
///
/// The span needs to be explicitly finished via [`Span::finish`], otherwise
/// it will not be sent.
#[derive(Clone, Debug)]
pub struct Span {
    pub(crate) transaction: TransactionArc,
    sampled: bool,
    span: SpanArc,
}

type SpanArc = Arc<Mutex<protocol::Span>>;

impl Span {
    /// Set some extra information to be sent with this span.
    pub fn set_data(&self, key: &str, value: protocol::Value) {
        let mut span = self.span.lock().unwrap_or_else(PoisonError::into_inner);
        span.data.insert(key.into(), value);
    }

    /// Get the status of the span.
    pub fn get_status(&self) -> Option<String> {
        let span = self.span.lock().unwrap_or_else(PoisonError::into_inner);
        span.status.clone()
    }

    /// Set the status of the span.
    pub fn set_status(&self, status: &str) {
        let mut span = self.span.lock().unwrap_or_else(PoisonError::into_inner);
        span.status = Some(status.into());
    }

    /// Finishes the span.
    ///
    /// This will record the end timestamp and add the span to the
    /// transaction in which it was started.  Finishing twice is a no-op.
    pub fn finish(self) {
        let mut span = self.span.lock().unwrap_or_else(PoisonError::into_inner);
        if span.timestamp.is_some() {
            // the span was already finished
            return;
        }
        span.timestamp = Some(SystemTime::now());
        let mut inner = self
            .transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(transaction) = inner.transaction.as_mut() {
            if transaction.spans.len() <= MAX_SPANS {
                transaction.spans.push(span.clone());
            }
        }
    }

    /// Starts a new child span with the given `op` and `description`.
    ///
    /// The span must be explicitly finished via [`Span::finish`].
    #[must_use = "a span must be explicitly closed via `finish()`"]
    pub fn start_child(&self, op: &str, description: &str) -> Span {
        let span = self.span.lock().unwrap_or_else(PoisonError::into_inner);
        let span = protocol::Span {
            trace_id: span.trace_id,
            parent_span_id: Some(span.span_id),
            op: Some(op.into()),
            description: if description.is_empty() {
                None
            } else {
                Some(description.into())
            },
            ..Default::default()
        };
        Span {
            transaction: self.transaction.clone(),
            sampled: self.sampled,
            span: Arc::new(Mutex::new(span)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsampled_without_client_sends_nothing() {
        let trx = Transaction::new(None, TransactionContext::new("noop", "noop"));
        let span = trx.start_child("child", "");
        span.finish();
        // no client was attached, so finishing must be inert
        trx.finish();
    }

    #[test]
    fn test_continue_from_span_inherits_trace() {
        let trx = Transaction::new(None, TransactionContext::new("root", "op"));
        let trace_id = trx
            .inner
            .lock()
            .unwrap()
            .context
            .trace_id;

        let ctx = TransactionContext::continue_from_span("child", "op", Some(trx.into()));
        assert_eq!(ctx.trace_id, trace_id);
        assert!(ctx.parent_span_id.is_some());
    }
}
