//! Errors.
//!
//! Native calls signal failure in-band, and store a complex error in
//! an out-parameter.  [`Error`] is the host-side copy of such an
//! error: the native error is inspected, its message is copied, and
//! then it is freed.

use std::fmt;
use std::io;

use sequoia_ffi::error::{
    self as native,
    Status,
};

use crate::glue::take_string;

/// Result type for the bindings.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Classifies errors.
///
/// This mirrors the native status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An unknown error occurred.
    Unknown,

    /// An IO error occurred.
    Io,

    /// A given argument is invalid.
    InvalidArgument,

    /// The requested operation is invalid.
    InvalidOperation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Unknown => "Unknown error",
            ErrorKind::Io => "IO error",
            ErrorKind::InvalidArgument => "Invalid argument",
            ErrorKind::InvalidOperation => "Invalid operation",
        })
    }
}

impl From<Status> for ErrorKind {
    fn from(status: Status) -> Self {
        match status {
            Status::IoError => ErrorKind::Io,
            Status::InvalidArgument => ErrorKind::InvalidArgument,
            Status::InvalidOperation => ErrorKind::InvalidOperation,
            // A failure reported as success is a bug on the other
            // side of the boundary.
            Status::Success | Status::UnknownError => ErrorKind::Unknown,
        }
    }
}

/// Errors returned by the bindings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    /// Creates an error.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Error {
            kind,
            message: message.into(),
        }
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Translates and frees a native error.
    ///
    /// Returns `None` if `err` is `NULL`, i.e. no error was stored.
    pub(crate) fn from_native(err: *mut native::Error) -> Option<Self> {
        if err.is_null() {
            return None;
        }

        let kind = native::pgp_error_status(err).into();
        let message = take_string(native::pgp_error_to_string(err))
            .unwrap_or_else(|| String::from("(no message)"));
        native::pgp_error_free(err);

        Some(Error { kind, message })
    }

    /// Returns an error for an operation on a released object.
    pub(crate) fn released(what: &str) -> Self {
        Error::new(ErrorKind::InvalidOperation,
                   format!("{} has been released", what))
    }
}

/// Wraps the error, which can be recovered using `downcast`.
///
/// Only `InvalidArgument` has an `io::ErrorKind` counterpart.  All
/// other kinds, including `Io`, become `io::ErrorKind::Other`, since
/// the native error does not carry the original `io::ErrorKind`.
impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match e.kind() {
            ErrorKind::InvalidArgument => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn no_error() {
        assert_eq!(Error::from_native(ptr::null_mut()), None);
    }

    #[test]
    fn translates_native_error() {
        let mut err = ptr::null_mut();
        let r = sequoia_ffi::io::pgp_reader_from_bytes(
            Some(&mut err), ptr::null(), 3);
        assert!(r.is_null());

        let e = Error::from_native(err).unwrap();
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(e.message().contains("NULL"), "{}", e);
    }

    #[test]
    fn kinds() {
        assert_eq!(ErrorKind::from(Status::IoError), ErrorKind::Io);
        assert_eq!(ErrorKind::from(Status::InvalidArgument),
                   ErrorKind::InvalidArgument);
        assert_eq!(ErrorKind::from(Status::InvalidOperation),
                   ErrorKind::InvalidOperation);
        assert_eq!(ErrorKind::from(Status::UnknownError),
                   ErrorKind::Unknown);
    }

    #[test]
    fn kind_display() {
        assert_eq!(ErrorKind::Io.to_string(), "IO error");
        assert_eq!(ErrorKind::InvalidOperation.to_string(),
                   "Invalid operation");
    }

    #[test]
    fn into_io_error() {
        let e: io::Error = Error::released("Reader").into();
        assert_eq!(e.kind(), io::ErrorKind::Other);
        let inner = e.get_ref().unwrap().downcast_ref::<Error>().unwrap();
        assert_eq!(inner.kind(), ErrorKind::InvalidOperation);
        assert_eq!(inner.message(), "Reader has been released");
    }
}
