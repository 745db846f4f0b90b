//! Maps various errors to status codes.
//!
//! Failing functions store a complex error at the location given
//! using the `errp` parameter.  Errors may be inspected using
//! [`pgp_error_status`], and formatted as an error message using
//! [`pgp_error_to_string`].  Errors must be freed using
//! [`pgp_error_free`].

use std::io;
use libc::c_char;

use sequoia_core as core;

/// A complex error.
///
/// Handed out as `*mut Error`, and freed with `pgp_error_free`.
pub type Error = ::anyhow::Error;

ffi_owned_type!(Error);

const TRACE: bool = false;

/// Frees an error.
#[no_mangle] pub extern "C"
fn pgp_error_free(error: *mut Error) {
    ffi_free!(error)
}

/// Returns the error message.
///
/// The returned value must be freed with `free(3)`.
#[no_mangle] pub extern "C"
fn pgp_error_to_string(error: *const Error) -> *mut c_char {
    let error = ffi_param_ref!(error);
    ffi_return_string!(format!("{}", error).replace('\0', ""))
}

/// Returns the error status code.
#[no_mangle] pub extern "C"
fn pgp_error_status(error: *const Error) -> Status {
    let error = ffi_param_ref!(error);
    error.into()
}

/// Status codes.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
#[repr(C)]
pub enum Status {
    /// The operation was successful.
    Success = 0,

    /// An unknown error occurred.
    UnknownError = -1,

    // XXX: -2 was NetworkPolicyViolation.

    /// An IO error occurred.
    IoError = -3,

    /// The requested operation is invalid.
    InvalidOperation = -4,

    /// A given argument is invalid.
    InvalidArgument = -15,
}

impl<'a> From<&'a Error> for Status {
    fn from(e: &'a Error) -> Self {
        tracer!(TRACE, "Status::from");

        if let Some(e) = e.downcast_ref::<core::Error>() {
            return match e {
                core::Error::InvalidArgument(_) =>
                    Status::InvalidArgument,
                core::Error::InvalidOperation(_) =>
                    Status::InvalidOperation,
            }
        }

        if e.downcast_ref::<io::Error>().is_some() {
            return Status::IoError;
        }

        t!("Error not converted: {}", e);
        Status::UnknownError
    }
}
