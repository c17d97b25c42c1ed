//! The panic handler integration.
//!
//! The [`PanicIntegration`], which is enabled by default, installs a panic
//! hook that dispatches all panics as fatal events.  Panics are forwarded to
//! the previously registered panic hook afterwards.
//!
//! # Configuration
//!
//! The panic integration can be configured with an additional extractor,
//! which may optionally create an event out of a `PanicInfo`:
//!
//! ```
//! use faultline::integrations::panic::PanicIntegration;
//!
//! let integration = PanicIntegration::default().add_extractor(|info| None);
//! ```

#[allow(deprecated)] // `PanicHookInfo` is only available in Rust 1.81+.
use std::panic::{self, PanicInfo};
use std::sync::Once;

use faultline_core::protocol::{Event, Exception, Level};
use faultline_core::{ClientOptions, Hub, Integration};

/// A panic handler that reports panics as events.
///
/// The handler runs the event through the regular capture pipeline of the
/// current hub and flushes the client afterwards, so the event does not sit
/// in the transport queue while the process unwinds.
#[allow(deprecated)]
pub fn panic_handler(info: &PanicInfo<'_>) {
    Hub::with_active(|hub| {
        let client = match hub.client() {
            Some(client) => client,
            None => return,
        };
        if let Some(integration) = client.get_integration::<PanicIntegration>() {
            hub.capture_event(integration.event_from_panic_info(info));
            client.flush(None);
        }
    });
}

#[allow(deprecated)]
type PanicExtractor = dyn Fn(&PanicInfo<'_>) -> Option<Event> + Send + Sync;

/// The panic handler integration.
#[derive(Default)]
pub struct PanicIntegration {
    extractors: Vec<Box<PanicExtractor>>,
}

impl std::fmt::Debug for PanicIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanicIntegration")
            .field("extractors", &self.extractors.len())
            .finish()
    }
}

static INIT: Once = Once::new();

impl Integration for PanicIntegration {
    fn name(&self) -> &'static str {
        "panic"
    }

    fn setup(&self, _cfg: &mut ClientOptions) {
        INIT.call_once(|| {
            let next = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                panic_handler(info);
                next(info);
            }));
        });
    }
}

/// Extract the message of a panic.
#[allow(deprecated)]
pub fn message_from_panic_info<'a>(info: &'a PanicInfo<'_>) -> &'a str {
    match info.payload().downcast_ref::<&'static str>() {
        Some(s) => s,
        None => match info.payload().downcast_ref::<String>() {
            Some(s) => &s[..],
            None => "Box<Any>",
        },
    }
}

impl PanicIntegration {
    /// Creates a new panic integration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new extractor.
    #[must_use]
    #[allow(deprecated)]
    pub fn add_extractor<F>(mut self, f: F) -> Self
    where
        F: Fn(&PanicInfo<'_>) -> Option<Event> + Send + Sync + 'static,
    {
        self.extractors.push(Box::new(f));
        self
    }

    /// Creates an event from the given panic info.
    #[allow(deprecated)]
    pub fn event_from_panic_info(&self, info: &PanicInfo<'_>) -> Event {
        for extractor in &self.extractors {
            if let Some(event) = extractor(info) {
                return event;
            }
        }

        let msg = message_from_panic_info(info);
        Event {
            exception: vec![Exception {
                ty: "panic".into(),
                value: Some(msg.to_string()),
                ..Default::default()
            }]
            .into(),
            level: Level::Fatal,
            ..Default::default()
        }
    }
}
