use std::error::Error;

use crate::protocol::{Event, Exception, Level};
use crate::types::Uuid;
use crate::Hub;

impl Hub {
    /// Capture any `std::error::Error`.
    pub fn capture_error<E: Error + ?Sized>(&self, error: &E) -> Uuid {
        let event = event_from_error(error);
        self.capture_event(event)
    }
}

/// Captures a `std::error::Error`.
///
/// Creates an event from the given error and sends it to the current hub.
/// A chain of errors will be resolved as well, and sorted oldest to newest.
///
/// # Examples
/// ```
/// faultline_core::capture_error(&std::io::Error::last_os_error());
/// ```
pub fn capture_error<E: Error + ?Sized>(error: &E) -> Uuid {
    Hub::with_active(|hub| hub.capture_error(error))
}

/// Create an [`Event`] from a `std::error::Error`.
///
/// A chain of errors will be resolved as well, and sorted oldest to newest.
///
/// # Examples
///
/// ```
/// use thiserror::Error;
///
/// #[derive(Debug, Error)]
/// #[error("inner")]
/// struct InnerError;
///
/// #[derive(Debug, Error)]
/// #[error("outer")]
/// struct OuterError(#[from] InnerError);
///
/// let event = faultline_core::event_from_error(&OuterError(InnerError));
/// assert_eq!(event.level, faultline_core::protocol::Level::Error);
/// assert_eq!(event.exception.len(), 2);
/// assert_eq!(&event.exception[0].ty, "InnerError");
/// assert_eq!(event.exception[0].value, Some("inner".into()));
/// assert_eq!(&event.exception[1].ty, "OuterError");
/// assert_eq!(event.exception[1].value, Some("outer".into()));
/// ```
pub fn event_from_error<E: Error + ?Sized>(err: &E) -> Event {
    let mut exceptions = vec![exception_from_error(err)];

    let mut source = err.source();
    while let Some(err) = source {
        exceptions.push(exception_from_error(err));
        source = err.source();
    }

    exceptions.reverse();
    Event {
        exception: exceptions.into(),
        level: Level::Error,
        ..Default::default()
    }
}

fn exception_from_error<E: Error + ?Sized>(err: &E) -> Exception {
    Exception {
        ty: parse_type_from_debug(err),
        value: Some(err.to_string()),
        ..Default::default()
    }
}

/// Parse the types name out of a `Debug` formatting.
///
/// # Examples
///
/// ```
/// use faultline_core::parse_type_from_debug;
///
/// let err = "NaN".parse::<usize>().unwrap_err();
/// assert_eq!(&parse_type_from_debug(&err), "ParseIntError");
/// ```
pub fn parse_type_from_debug<D: std::fmt::Debug + ?Sized>(d: &D) -> String {
    let dbg = format!("{d:#?}");

    dbg.split(&[' ', '(', '{', '\r', '\n'][..])
        .next()
        .unwrap_or(&dbg)
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_from_debug() {
        #[derive(Debug)]
        struct MyStruct;
        assert_eq!(&parse_type_from_debug(&MyStruct), "MyStruct");

        let err = "NaN".parse::<usize>().unwrap_err();
        assert_eq!(&parse_type_from_debug(&err), "ParseIntError");
    }

    #[test]
    fn test_error_chain_ordering() {
        use thiserror::Error;

        #[derive(Debug, Error)]
        #[error("inner")]
        struct InnerError;

        #[derive(Debug, Error)]
        #[error("outer")]
        struct OuterError(#[from] InnerError);

        let event = event_from_error(&OuterError(InnerError));
        assert_eq!(event.exception.len(), 2);
        assert_eq!(&event.exception[0].ty, "InnerError");
        assert_eq!(&event.exception[1].ty, "OuterError");
    }
}
