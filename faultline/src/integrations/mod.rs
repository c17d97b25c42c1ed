//! Available integrations.
//!
//! Integrations extend the functionality of the SDK.  They come in two
//! primary kinds: as event *sources* or as event *processors*.
//!
//! Integrations which *process* events implement the
//! [`Integration`](crate::Integration) trait and need to be installed when
//! the client is created, using
//! [`ClientOptions::add_integration`](crate::ClientOptions::add_integration).
//! The default set is put in place by [`apply_defaults`](crate::apply_defaults)
//! unless [`ClientOptions::default_integrations`](crate::ClientOptions::default_integrations)
//! is disabled.

#[cfg(feature = "panic")]
pub mod panic;
