use std::sync::Arc;

use faultline_core::faultline_debug;

use crate::defaults::apply_defaults;
use crate::{Client, ClientOptions, Hub};

/// Helper struct that is returned from `init`.
///
/// When this is dropped events are drained with the configured
/// `shutdown_timeout`.
#[must_use = "when the init guard is dropped the transport will be shut down and no further \
              events can be sent.  If you do want to ignore this use mem::forget on it."]
pub struct ClientInitGuard(Arc<Client>);

impl ClientInitGuard {
    /// Quick check if the client is enabled.
    pub fn is_enabled(&self) -> bool {
        self.0.is_enabled()
    }
}

impl Drop for ClientInitGuard {
    fn drop(&mut self) {
        if self.is_enabled() {
            faultline_debug!("dropping client guard -> disposing client");
        } else {
            faultline_debug!("dropping client guard (no client to dispose)");
        }
        self.0.close(None);
    }
}

/// Creates the client for a given config and binds it to the current hub.
///
/// This returns a client init guard that must be kept in scope, it will help
/// the client send events before the application closes.  When the guard is
/// dropped the transport that was initialized shuts down and no further
/// events can be sent on it.
///
/// If you don't want (or can't) keep the guard around it's permissible to
/// call `mem::forget` on it.
///
/// # Examples
///
/// ```
/// let _faultline = faultline::init("https://key@ingest.faultline.dev/1234");
/// ```
///
/// Or if draining on shutdown should be ignored:
///
/// ```
/// std::mem::forget(faultline::init("https://key@ingest.faultline.dev/1234"));
/// ```
///
/// The guard returned can also be inspected to see if a client has been
/// created to enable further configuration:
///
/// ```
/// let faultline = faultline::init(faultline::ClientOptions {
///     release: Some("foo-bar-baz@1.0.0".into()),
///     ..Default::default()
/// });
/// if faultline.is_enabled() {
///     // further setup
/// }
/// ```
///
/// An invalid DSN does not panic but leaves a disabled client bound, so the
/// whole API stays callable.  This function accepts everything that converts
/// into [`ClientOptions`], most importantly a DSN string or a
/// `(dsn, options)` tuple.
pub fn init<C: Into<ClientOptions>>(cfg: C) -> ClientInitGuard {
    let options = apply_defaults(cfg.into());
    let client = Arc::new(Client::from(options));
    Hub::with(|hub| hub.bind_client(Some(client.clone())));
    if let Some(dsn) = client.dsn() {
        faultline_debug!("enabled faultline client for DSN {}", dsn);
    } else {
        faultline_debug!("initialized disabled faultline client due to disabled or invalid DSN");
    }
    ClientInitGuard(client)
}
