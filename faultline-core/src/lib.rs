//! This crate provides the core of the Faultline SDK, which can be used to
//! capture events, manage scopes and send envelopes to a Faultline relay.
//!
//! `faultline-core` is meant for integration authors and third-party library
//! authors that want to instrument their code.  Applications should instead
//! use the [`faultline`](https://crates.io/crates/faultline) crate, which
//! comes with a default transport and the default integrations.
//!
//! # Core Concepts
//!
//! The crate is centered around the concepts of [`Client`], [`Hub`] and
//! [`Scope`], as well as the extension points via the [`Integration`],
//! [`Transport`] and [`TransportFactory`] traits.
//!
//! A [`Hub`] holds a [`Client`] and a two-tier set of scopes: a long-lived
//! *isolation scope* meant to correspond to one logical unit of work (a
//! request, a job run), and a stack of short-lived *current scopes* pushed by
//! [`with_scope`].  When an event is captured, the data of both tiers is
//! merged onto it before it runs through the event processor pipeline.
//!
//! # Parallelism, Concurrency and Async
//!
//! The main concurrency primitive is the [`Hub`].  All concurrent code, no
//! matter if multithreaded parallelism or futures concurrency, needs to run
//! with its own copy of a [`Hub`].  For threads or tasks that are running
//! concurrently or outlive the current execution context, a new hub needs to
//! be created and bound for the computation:
//!
//! ```
//! use std::sync::Arc;
//! use faultline_core::Hub;
//!
//! let hub = Arc::new(Hub::new_from_top(Hub::current()));
//! let result = std::thread::spawn(move || Hub::run(hub, || 1_u32))
//!     .join()
//!     .unwrap();
//! assert_eq!(result, 1);
//! ```
//!
//! Futures can carry their hub across suspension points with
//! [`FaultlineFutureExt::bind_hub`], which re-installs the bound hub for the
//! duration of every poll.  A logical task that fails to do this may observe
//! another task's scope, which is a correctness bug, not a cosmetic one.

#![warn(missing_docs)]

// macros; these need to be first to be used by other modules
#[macro_use]
#[doc(hidden)]
pub mod macros;

mod api;
mod breadcrumbs;
mod client;
mod clientoptions;
mod constants;
mod error;
mod futures;
mod hub;
mod integration;
mod intodsn;
mod outcomes;
mod performance;
mod scope;
mod session;
mod transport;

// public api or exports from this crate
pub use crate::api::*;
pub use crate::breadcrumbs::IntoBreadcrumbs;
pub use crate::client::Client;
pub use crate::clientoptions::{BeforeCallback, ClientOptions};
pub use crate::constants::{SDK_INFO, USER_AGENT, VERSION};
pub use crate::error::{capture_error, event_from_error, parse_type_from_debug};
pub use crate::futures::{FaultlineFuture, FaultlineFutureExt};
pub use crate::hub::Hub;
pub use crate::integration::{AsAny, Integration};
pub use crate::intodsn::IntoDsn;
pub use crate::outcomes::OutcomeRecorder;
pub use crate::performance::{
    start_transaction, PropagationContext, Span, Transaction, TransactionContext,
    TransactionOrSpan,
};
pub use crate::scope::{EventProcessor, Scope, ScopeGuard};
pub use crate::session::SessionStatus;
pub use crate::transport::{Transport, TransportFactory};

// test utilities
#[cfg(feature = "test")]
pub mod test;

// public api from other crates
#[doc(inline)]
pub use faultline_types as types;
pub use faultline_types::protocol;
pub use faultline_types::protocol::{Breadcrumb, Envelope, Level, User};
pub use faultline_types::Uuid;
