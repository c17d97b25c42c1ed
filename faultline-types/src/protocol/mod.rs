//! The current latest faultline protocol version.
//!
//! Events, transactions and the other envelope item payloads are at the top
//! level of this module, together with the [`Envelope`] container format
//! itself.

mod attachment;
mod client_report;
mod envelope;
mod event;
mod session;
mod transaction;

pub use attachment::{Attachment, AttachmentType};
pub use client_report::{ClientReport, DataCategory, DiscardReason, DiscardedEvent};
pub use envelope::{Envelope, EnvelopeItem};
pub use event::*;
pub use session::{SessionAttributes, SessionStatus, SessionUpdate};
pub use transaction::{Span, Transaction};
