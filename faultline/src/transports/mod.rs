//! The provided transports.
//!
//! This module exposes all transports that are compiled into the faultline
//! library.  The `ureq` feature turns on the only one currently provided.

use std::sync::Arc;

use faultline_core::{ClientOptions, OutcomeRecorder, Transport, TransportFactory};

#[cfg(feature = "httpdate")]
mod ratelimit;
#[cfg(feature = "ureq")]
mod thread;

#[cfg(feature = "ureq")]
mod ureq;
#[cfg(feature = "ureq")]
pub use ureq::UreqHttpTransport;

#[cfg(feature = "ureq")]
type DefaultTransport = UreqHttpTransport;

/// The default http transport.
#[cfg(feature = "ureq")]
pub type HttpTransport = DefaultTransport;

/// Creates the default HTTP transport.
///
/// This is the default value for `transport` on the client options.  It
/// creates a `HttpTransport`.  If no http transport was compiled into the
/// library it will panic on transport creation.
#[derive(Clone)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create_transport(
        &self,
        options: &ClientOptions,
        outcomes: OutcomeRecorder,
    ) -> Arc<dyn Transport> {
        #[cfg(feature = "ureq")]
        {
            Arc::new(HttpTransport::new(options, outcomes))
        }
        #[cfg(not(feature = "ureq"))]
        {
            let _ = (options, outcomes);
            panic!("faultline crate was compiled without transport")
        }
    }
}
