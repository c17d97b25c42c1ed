//! This crate provides support for logging events, release-health sessions
//! and tracing data to a Faultline relay.  It integrates with the standard
//! panic system in Rust and ships a default HTTP transport.
//!
//! # Quickstart
//!
//! The most convenient way to use this library is the [`init`] function,
//! which starts a client with a default set of integrations and binds it to
//! the current [`Hub`].
//!
//! The [`init`] function returns a guard that when dropped will flush events
//! that were not yet sent.  It waits for the configured `shutdown_timeout`,
//! so shutdown of applications might slightly delay as a result.  Keep the
//! guard around or sending events will not work.
//!
//! ```
//! let _guard = faultline::init("https://key@ingest.faultline.dev/42");
//! faultline::capture_message("Hello World!", faultline::Level::Info);
//! // when the guard goes out of scope here, the client will wait until all
//! // queued envelopes are sent or the shutdown timeout passes.
//! ```
//!
//! # Scopes
//!
//! Captured events are enriched from two tiers of scope data.  The
//! *isolation scope* spans one logical unit of work, such as one request,
//! and is where breadcrumbs, the user and release-health sessions live.  The
//! *current scope* is a stack for short-lived overrides:
//!
//! ```
//! faultline::configure_isolation_scope(|scope| {
//!     scope.set_tag("worker", "billing");
//! });
//! faultline::with_scope(
//!     |scope| scope.set_level(Some(faultline::Level::Warning)),
//!     || faultline::capture_message("looks dodgy", faultline::Level::Info),
//! );
//! ```
//!
//! # Minimal API
//!
//! This crate comes fully featured.  If the goal is to instrument libraries,
//! or to extend the SDK with a custom [`Integration`] or [`Transport`], one
//! should use the `faultline-core` crate instead.
//!
//! # Features
//!
//! * `panic`: Enables the panic handler integration (default).
//! * `transport`: Enables the default `ureq` transport (default).
//! * `test`: Enables testing support.

#![warn(missing_docs)]

mod defaults;
mod init;

// re-export from core
#[doc(inline)]
pub use faultline_core::*;

// added public API
pub use crate::defaults::apply_defaults;
pub use crate::init::{init, ClientInitGuard};

pub mod integrations;

#[cfg(any(feature = "httpdate", feature = "ureq"))]
pub mod transports;
