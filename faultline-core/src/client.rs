use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe, RefUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use rand::random;

use crate::constants::SDK_INFO;
use crate::protocol::{ClientSdkInfo, DataCategory, DiscardReason, Event};
use crate::types::random_uuid;
use crate::types::{Dsn, Uuid};
use crate::{ClientOptions, Envelope, Hub, Integration, OutcomeRecorder, Scope, Transport};

impl<T: Into<ClientOptions>> From<T> for Client {
    fn from(o: T) -> Client {
        Client::with_options(o.into())
    }
}

pub(crate) type TransportArc = Arc<RwLock<Option<Arc<dyn Transport>>>>;

/// The Faultline client.
///
/// The client is responsible for event processing and sending events to the
/// relay via the configured [`Transport`].  It can be created from a
/// [`ClientOptions`].
///
/// A client without a DSN or transport is *inert*: capturing through it still
/// returns event ids, but nothing is processed or sent.
///
/// # Examples
///
/// ```
/// faultline_core::Client::from(faultline_core::ClientOptions::default());
/// ```
pub struct Client {
    options: ClientOptions,
    transport: TransportArc,
    outcomes: OutcomeRecorder,
    integrations: Vec<Arc<dyn Integration>>,
    pub(crate) sdk_info: ClientSdkInfo,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("dsn", &self.dsn())
            .field("options", &self.options)
            .finish()
    }
}

impl Clone for Client {
    fn clone(&self) -> Client {
        let transport = Arc::new(RwLock::new(
            self.transport
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        ));
        Client {
            options: self.options.clone(),
            transport,
            outcomes: self.outcomes.clone(),
            integrations: self.integrations.clone(),
            sdk_info: self.sdk_info.clone(),
        }
    }
}

impl Client {
    /// Creates a new client from a config.
    ///
    /// # Supported Configs
    ///
    /// The following common values are supported for the client config:
    ///
    /// * `ClientOptions`: configure the client with the given client options.
    /// * `()` or empty string: Disable the client.
    /// * `&str` / `String`: configure the client with the given DSN.
    /// * `Dsn` / `&Dsn`: configure the client with a given DSN.
    /// * `(Dsn, ClientOptions)`: configure the client from the given DSN and
    ///   optional options.
    ///
    /// A string that does not parse as a DSN disables the client instead of
    /// panicking.
    pub fn from_config<O: Into<ClientOptions>>(opts: O) -> Client {
        Client::with_options(opts.into())
    }

    /// Creates a new client for the given options.
    ///
    /// If the DSN on the options is set to `None` the client will be entirely
    /// disabled.
    pub fn with_options(mut options: ClientOptions) -> Client {
        // Create the main hub eagerly to avoid problems with the background thread
        Hub::with(|_| {});

        crate::macros::set_debug_enabled(options.debug);

        // Deduplicate integrations by name, the last registration wins but
        // keeps the position of the first.
        let mut integrations: Vec<Arc<dyn Integration>> = Vec::new();
        for integration in &options.integrations {
            match integrations
                .iter_mut()
                .find(|known| known.name() == integration.name())
            {
                Some(known) => *known = integration.clone(),
                None => integrations.push(integration.clone()),
            }
        }

        let mut sdk_info = SDK_INFO.clone();
        for integration in &integrations {
            faultline_debug!("[Client] setting up integration {}", integration.name());
            integration.setup(&mut options);
            sdk_info.integrations.push(integration.name().to_string());
        }

        let outcomes = OutcomeRecorder::new();

        let create_transport = || {
            options.dsn.as_ref()?;
            let factory = options.transport.as_ref()?;
            Some(factory.create_transport(&options, outcomes.clone()))
        };
        let transport = Arc::new(RwLock::new(create_transport()));

        Client {
            options,
            transport,
            outcomes,
            integrations,
            sdk_info,
        }
    }

    /// Looks up a registered integration by its concrete type.
    pub fn get_integration<I>(&self) -> Option<&I>
    where
        I: Integration,
    {
        self.integrations
            .iter()
            .find_map(|integration| integration.as_ref().as_any().downcast_ref())
    }

    /// Prepares an event for transmission.
    ///
    /// The scope tiers are merged onto the event first (isolation scope, then
    /// current scope, so the inner tier wins on conflicts).  Then the
    /// pipeline runs in a fixed order: integration hooks, isolation scope
    /// processors, current scope processors and finally `before_send`.
    ///
    /// Returns `None` if any stage drops the event; the corresponding
    /// outcome has then been recorded.
    pub fn prepare_event(
        &self,
        mut event: Event,
        isolation: Option<&Scope>,
        scope: Option<&Scope>,
    ) -> Option<Event> {
        // event_id and sdk_info are set before anything else runs so that
        // processors can poke around in that data
        if event.event_id.is_nil() {
            event.event_id = random_uuid();
        }
        if event.sdk.is_none() {
            event.sdk = Some(self.sdk_info.clone());
        }

        if let Some(isolation) = isolation {
            event = isolation.apply_to_event(event);
        }
        if let Some(scope) = scope {
            event = scope.apply_to_event(event);
        }

        if event.release.is_none() {
            event.release = self.options.release.as_ref().map(|r| r.to_string());
        }
        if event.environment.is_none() {
            event.environment = self.options.environment.as_ref().map(|e| e.to_string());
        }
        if event.server_name.is_none() {
            event.server_name = self.options.server_name.as_ref().map(|s| s.to_string());
        }

        for integration in &self.integrations {
            let id = event.event_id;
            let backup = event.clone();
            event = match catch_unwind(AssertUnwindSafe(|| {
                integration.process_event(event, &self.options)
            })) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    faultline_debug!(
                        "[Client] integration {} dropped event {id}",
                        integration.name()
                    );
                    self.outcomes
                        .record(DiscardReason::EventProcessor, DataCategory::Error);
                    return None;
                }
                Err(_) => {
                    faultline_debug!(
                        "[Client] integration {} panicked on event {id}",
                        integration.name()
                    );
                    backup
                }
            };
        }

        if let Some(isolation) = isolation {
            event = match isolation.run_event_processors(event) {
                Some(event) => event,
                None => {
                    self.outcomes
                        .record(DiscardReason::EventProcessor, DataCategory::Error);
                    return None;
                }
            };
        }
        if let Some(scope) = scope {
            event = match scope.run_event_processors(event) {
                Some(event) => event,
                None => {
                    self.outcomes
                        .record(DiscardReason::EventProcessor, DataCategory::Error);
                    return None;
                }
            };
        }

        if let Some(ref func) = self.options.before_send {
            let id = event.event_id;
            let backup = event.clone();
            event = match catch_unwind(AssertUnwindSafe(|| func(event))) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    faultline_debug!("[Client] before_send dropped event {id}");
                    self.outcomes
                        .record(DiscardReason::BeforeSend, DataCategory::Error);
                    return None;
                }
                Err(_) => {
                    faultline_debug!("[Client] before_send panicked on event {id}");
                    backup
                }
            };
        }

        if let Some(isolation) = isolation {
            isolation.update_session_from_event(&event);
        }

        self.enforce_limits(&mut event);
        Some(event)
    }

    /// Truncates oversized values on the event right before it is sent.
    fn enforce_limits(&self, event: &mut Event) {
        fn truncate(value: &mut String, max: usize) {
            if value.len() > max {
                let mut idx = max;
                while !value.is_char_boundary(idx) {
                    idx -= 1;
                }
                value.truncate(idx);
            }
        }

        let max = self.options.max_value_length;
        if let Some(message) = event.message.as_mut() {
            truncate(message, max);
        }
        for value in event.tags.values_mut() {
            truncate(value, max);
        }
        for breadcrumb in event.breadcrumbs.iter_mut() {
            if let Some(message) = breadcrumb.message.as_mut() {
                truncate(message, max);
            }
        }

        // older breadcrumbs go first
        let len = event.breadcrumbs.len();
        if len > self.options.max_breadcrumbs {
            event.breadcrumbs.drain(..len - self.options.max_breadcrumbs);
        }
    }

    /// Returns the options of this client.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the DSN that constructed this client.
    pub fn dsn(&self) -> Option<&Dsn> {
        self.options.dsn.as_ref()
    }

    /// Returns the client's outcome recorder.
    pub fn outcomes(&self) -> &OutcomeRecorder {
        &self.outcomes
    }

    /// Quick check to see if the client is enabled.
    ///
    /// The client is enabled if it has a valid DSN and transport configured.
    pub fn is_enabled(&self) -> bool {
        self.options.dsn.is_some()
            && self
                .transport
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
    }

    /// Captures an event and sends it to the relay.
    ///
    /// This always returns the event's id, also when the event is sampled
    /// out, dropped by a processor or the client is inert, so that callers
    /// can correlate logs with would-be reports.
    pub fn capture_event(
        &self,
        mut event: Event,
        isolation: Option<&Scope>,
        scope: Option<&Scope>,
    ) -> Uuid {
        if event.event_id.is_nil() {
            event.event_id = random_uuid();
        }
        let event_id = event.event_id;

        let transport = self
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(transport) = transport else {
            return event_id;
        };

        // sampling runs before any processing so that sampled-out events
        // cost as little as possible
        if !self.sample_should_send(self.options.sample_rate) {
            faultline_debug!("[Client] event {event_id} sampled out");
            self.outcomes
                .record(DiscardReason::SampleRate, DataCategory::Error);
            return event_id;
        }

        if let Some(event) = self.prepare_event(event, isolation, scope) {
            let mut envelope: Envelope = event.into();

            if let Some(isolation) = isolation {
                if let Some(item) = isolation
                    .session
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .as_mut()
                    .and_then(|session| session.create_envelope_item())
                {
                    envelope.add_item(item);
                }
            }

            for tier in [isolation, scope].into_iter().flatten() {
                for attachment in tier.attachments.iter().cloned() {
                    envelope.add_item(attachment);
                }
            }

            transport.send_envelope(envelope);
        }
        event_id
    }

    /// Sends the specified [`Envelope`] to the relay.
    pub fn send_envelope(&self, envelope: Envelope) {
        if let Some(ref transport) = *self
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
        {
            transport.send_envelope(envelope);
        }
    }

    /// Drains all pending events without shutting down.
    pub fn flush(&self, timeout: Option<Duration>) -> bool {
        if let Some(ref transport) = *self
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
        {
            transport.flush(timeout.unwrap_or(self.options.shutdown_timeout))
        } else {
            true
        }
    }

    /// Drains all pending events and shuts down the transport behind the
    /// client.  After shutting down the transport is removed.
    ///
    /// This returns `true` if the queue was successfully drained in the
    /// given time or `false` if not (for instance because of a timeout).
    /// If no timeout is provided the client will wait for as long as
    /// `shutdown_timeout` in the client options.  Closing an already closed
    /// client does nothing and reports success.
    pub fn close(&self, timeout: Option<Duration>) -> bool {
        let transport_opt = self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(transport) = transport_opt {
            transport.shutdown(timeout.unwrap_or(self.options.shutdown_timeout))
        } else {
            true
        }
    }

    /// Returns a random boolean with a probability defined by rate.
    pub fn sample_should_send(&self, rate: f32) -> bool {
        if rate >= 1.0 {
            true
        } else if rate <= 0.0 {
            false
        } else {
            random::<f32>() < rate
        }
    }
}

// Make this unwind safe.  It's not out of the box because of the
// `BeforeCallback`s inside `ClientOptions`, and the contained Integrations
impl RefUnwindSafe for Client {}
