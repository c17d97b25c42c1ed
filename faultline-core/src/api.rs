use crate::protocol::{Event, Level};
use crate::types::Uuid;
use crate::{Hub, IntoBreadcrumbs, Scope, SessionStatus};

/// Captures an event on the currently active client if any.
///
/// The event must already be assembled.  Typically code would instead use
/// the utility methods like [`capture_message`] or
/// [`capture_error`](crate::capture_error).  The return value is the event
/// ID.  In case the SDK is disabled the event is discarded but its id is
/// still returned.
///
/// # Example
///
/// ```
/// use faultline_core::protocol::{Event, Level};
///
/// faultline_core::capture_event(Event {
///     message: Some("Hello World!".into()),
///     level: Level::Info,
///     ..Default::default()
/// });
/// ```
pub fn capture_event(event: Event) -> Uuid {
    Hub::with(|hub| hub.capture_event(event))
}

/// Captures an arbitrary message.
///
/// This creates an event from the given message and sends it to the current
/// hub.
pub fn capture_message(msg: &str, level: Level) -> Uuid {
    Hub::with(|hub| hub.capture_message(msg, level))
}

/// Records a breadcrumb by calling a function.
///
/// The total number of breadcrumbs that can be recorded are limited by the
/// configuration on the client.  This function accepts any object that
/// implements [`IntoBreadcrumbs`], which is implemented for a variety of
/// common types.  For efficiency reasons you can also pass a closure
/// returning a breadcrumb in which case the closure is only called if the
/// client is enabled.
///
/// Breadcrumbs land on the isolation scope, so they survive
/// [`with_scope`] blocks and are visible on all events of the current unit
/// of work.
///
/// The most common implementations that can be passed:
///
/// * `Breadcrumb`: to record a breadcrumb
/// * `Vec<Breadcrumb>`: to record more than one breadcrumb in one go.
/// * `Option<Breadcrumb>`: to record a breadcrumb or not
/// * additionally all of these can also be returned from an `FnOnce()`
///
/// # Example
///
/// ```
/// use faultline_core::protocol::{Breadcrumb, Map};
///
/// faultline_core::add_breadcrumb(|| Breadcrumb {
///     ty: "http".into(),
///     category: Some("request".into()),
///     data: {
///         let mut map = Map::new();
///         map.insert("method".into(), "GET".into());
///         map.insert("url".into(), "https://example.com/".into());
///         map
///     },
///     ..Default::default()
/// });
/// ```
pub fn add_breadcrumb<B: IntoBreadcrumbs>(breadcrumb: B) {
    Hub::with_active(|hub| hub.add_breadcrumb(breadcrumb))
}

/// Invokes a function that can modify the current scope.
///
/// The function is passed a mutable reference to the [`Scope`] so that
/// modifications can be performed.
///
/// # Example
///
/// ```
/// faultline_core::configure_scope(|scope| {
///     scope.set_user(Some(faultline_core::User {
///         username: Some("john_doe".into()),
///         ..Default::default()
///     }));
/// });
/// ```
pub fn configure_scope<F, R>(f: F) -> R
where
    F: FnOnce(&mut Scope) -> R,
{
    Hub::with(|hub| hub.configure_scope(f))
}

/// Invokes a function that can modify the isolation scope.
///
/// Data set here outlives any [`with_scope`] blocks and applies to every
/// event captured in the current unit of work.
pub fn configure_isolation_scope<F, R>(f: F) -> R
where
    F: FnOnce(&mut Scope) -> R,
{
    Hub::with(|hub| hub.configure_isolation_scope(f))
}

/// Temporarily pushes a scope for a single call optionally reconfiguring it.
///
/// This function takes two arguments: the first is a callback that is passed
/// a scope and can reconfigure it.  The second is a callback that then
/// executes in the context of that scope.
///
/// This is useful when extra data should be sent with a single capture call,
/// for instance a different level or tags:
///
/// ```
/// use faultline_core::{capture_message, with_scope, Level};
///
/// with_scope(
///     |scope| scope.set_level(Some(Level::Warning)),
///     || capture_message("some error", Level::Info),
/// );
/// ```
pub fn with_scope<C, F, R>(scope_config: C, callback: F) -> R
where
    C: FnOnce(&mut Scope),
    F: FnOnce() -> R,
{
    Hub::with(|hub| hub.with_scope(scope_config, callback))
}

/// Runs a callback with a forked isolation scope.
///
/// The callback executes with a fork of the current isolation scope, so
/// breadcrumbs, user and session state recorded inside stay contained and
/// the previous isolation scope is restored afterwards.  This is the
/// boundary to draw around one logical unit of work, such as one request or
/// one job run.
///
/// ```
/// use faultline_core::{add_breadcrumb, capture_message, with_isolation_scope, Level};
///
/// with_isolation_scope(
///     |scope| scope.set_tag("job", "refresh-caches"),
///     || {
///         add_breadcrumb(faultline_core::Breadcrumb::default());
///         capture_message("job failed", Level::Error)
///     },
/// );
/// ```
pub fn with_isolation_scope<C, F, R>(scope_config: C, callback: F) -> R
where
    C: FnOnce(&mut Scope),
    F: FnOnce() -> R,
{
    Hub::with(|hub| hub.with_isolation_scope(scope_config, callback))
}

/// Returns the last event ID captured.
///
/// This uses the current thread local hub.
pub fn last_event_id() -> Option<Uuid> {
    Hub::with(|hub| hub.last_event_id())
}

/// Start a new release-health session on the current hub.
///
/// The session lives on the isolation scope.  This does nothing if the
/// client options carry no release.
pub fn start_session() {
    Hub::with_active(|hub| hub.start_session())
}

/// End the current release-health session as exited.
pub fn end_session() {
    Hub::with_active(|hub| hub.end_session())
}

/// End the current release-health session with the given status.
pub fn end_session_with_status(status: SessionStatus) {
    Hub::with_active(|hub| hub.end_session_with_status(status))
}
