use std::any::Any;

use crate::protocol::Event;
use crate::ClientOptions;

/// Helper trait for upcasting integrations to [`Any`] for downcasting.
///
/// This is implemented for every `'static` type and exists so that
/// [`Client::get_integration`](crate::Client) can recover the concrete type
/// behind a `dyn Integration`.
pub trait AsAny {
    /// Returns `self` as a `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Integration abstraction.
///
/// An integration is a named unit of behavior plugged into the client at
/// setup time.  Registration is deduplicated by [`name`](Integration::name):
/// registering a second integration with the same name replaces the first,
/// so double setup can never produce duplicate side effects.
///
/// The [`setup`](Integration::setup) hook runs once when the client is
/// created and may freely mutate the not-yet-final options, for instance to
/// install hooks or register global state.  The
/// [`process_event`](Integration::process_event) hook runs for every
/// captured event, before any scope-attached processors, and may mutate or
/// drop the event.
pub trait Integration: AsAny + Sync + Send + 'static {
    /// The name of the integration.
    fn name(&self) -> &'static str;

    /// Called whenever the integration is attached to a client.
    fn setup(&self, options: &mut ClientOptions) {
        let _ = options;
    }

    /// The hook that is called for every event, to process it, or to filter
    /// it out completely by returning `None`.
    fn process_event(&self, event: Event, options: &ClientOptions) -> Option<Event> {
        let _ = options;
        Some(event)
    }
}
