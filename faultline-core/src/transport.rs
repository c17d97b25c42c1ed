use std::sync::Arc;
use std::time::Duration;

use crate::{ClientOptions, Envelope, OutcomeRecorder};

/// The trait for transports.
///
/// A transport is responsible for shipping envelopes to the relay.  It gets
/// its envelopes from the [`Client`](crate::Client) and all transports must
/// be safe to share between threads.  Transports should generally be
/// non-blocking: `send_envelope` enqueues and returns, a background worker
/// does the actual I/O.
pub trait Transport: Send + Sync + 'static {
    /// Sends an [`Envelope`].
    fn send_envelope(&self, envelope: Envelope);

    /// Drains the transport queue if there is one.
    ///
    /// The default implementation does nothing.  If the queue was successfully
    /// drained, the return value should be `true` or `false` if events were
    /// left in it.
    fn flush(&self, timeout: Duration) -> bool {
        let _ = timeout;
        true
    }

    /// Instructs the transport to flush its queue and shut down.
    ///
    /// This has a default implementation that just calls
    /// [`flush`](Transport::flush).
    fn shutdown(&self, timeout: Duration) -> bool {
        self.flush(timeout)
    }
}

/// A factory creating transport instances.
///
/// Because the client can be restarted and the DSN changed, transports are
/// created on demand from a factory instead of being set directly.  The
/// factory receives the final client options and the client's
/// [`OutcomeRecorder`], so that the transport can count items it discards
/// (queue overflow, rate limits, failed sends) into the same client reports
/// as the capture pipeline.
///
/// The factory is invoked with the options after all integrations ran their
/// setup hook.
pub trait TransportFactory: Send + Sync {
    /// Given the options and the shared outcome recorder, creates a new
    /// transport instance.
    fn create_transport(&self, options: &ClientOptions, outcomes: OutcomeRecorder)
        -> Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&ClientOptions, OutcomeRecorder) -> Arc<dyn Transport> + Send + Sync,
{
    fn create_transport(
        &self,
        options: &ClientOptions,
        outcomes: OutcomeRecorder,
    ) -> Arc<dyn Transport> {
        self(options, outcomes)
    }
}

impl<T: Transport> TransportFactory for Arc<T> {
    fn create_transport(
        &self,
        _options: &ClientOptions,
        _outcomes: OutcomeRecorder,
    ) -> Arc<dyn Transport> {
        self.clone()
    }
}
