//! This crate provides common types for working with the Faultline protocol
//! or the Faultline server.  It's used by the Faultline Rust SDK but can also
//! be used to write tools that work with the wire protocol directly, such as
//! proxies or custom transports.
//!
//! Right now this crate provides the following:
//!
//! * DSN parsing and minimal manipulation ([`Dsn`])
//! * the auth header the relay expects ([`Auth`])
//! * project IDs ([`ProjectId`])
//! * the item-stream [`Envelope`](protocol::Envelope) container format
//! * the protocol value types behind the `protocol` feature

#![warn(missing_docs)]
#![allow(clippy::derive_partial_eq_without_eq)]

mod auth;
mod dsn;
mod project_id;
mod utils;

pub use crate::auth::{Auth, AuthParseError};
pub use crate::dsn::{Dsn, DsnParseError, Scheme};
pub use crate::project_id::{ParseProjectIdError, ProjectId};
pub use crate::utils::{datetime_to_timestamp, timestamp_to_datetime, to_rfc3339, ts_rfc3339, ts_seconds_float};

#[cfg(feature = "protocol")]
pub mod protocol;

pub use uuid::Uuid;

/// Creates a new random uuid (v4) for event and session identifiers.
pub fn random_uuid() -> Uuid {
    Uuid::new_v4()
}
