//! Provides a Foreign Function Interface.
//!
//! We provide a set of functions that use C types and the C calling
//! convention.  These interfaces allow you to use Sequoia from any
//! other language provided that you follow [The Rules].
//!
//! [The Rules]: #the-rules
//!
//! # The Rules
//!
//! These rules must be followed.  Failure to follow these rules
//! results in problems like memory leaks, undefined behavior, or
//! process termination.
//!
//! ## Error Handling
//!
//! Failing functions signal failure in-band (e.g. `NULL`, or -1), or
//! using `pgp_status_t`, and store complex error information in a
//! caller-provided location.  For example, [`sq_config_build`] will
//! return `NULL` and store a complex error at the location given
//! using the `errp` parameter.  `errp` may be `NULL`, in which case
//! the error is dropped.  The error location is only written to on
//! failure.
//!
//! [`sq_config_build`]: core/fn.sq_config_build.html
//!
//! Errors may be inspected using [`pgp_error_status`], and formatted
//! as an error message using [`pgp_error_to_string`].  Errors must be
//! freed using [`pgp_error_free`].
//!
//! [`pgp_error_status`]: error/fn.pgp_error_status.html
//! [`pgp_error_to_string`]: error/fn.pgp_error_to_string.html
//! [`pgp_error_free`]: error/fn.pgp_error_free.html
//!
//! ## Objects
//!
//! Sequoia objects are opaque objects.  They are created in
//! constructors, and must be freed when no longer needed.  Failure to
//! free an object results in a memory leak.  Freeing an object twice
//! is undefined behavior.  The destructors (`*_free`) accept `NULL`.
//!
//! ## References
//!
//! All references transferred across the FFI boundary must be valid,
//! and point to live objects constructed using constructors of this
//! library.  Passing `NULL` where an object is expected terminates
//! the process.
//!
//! ## Lifetimes
//!
//! Objects created using a context must not outlive that context.
//! Readers and writers created from memory must not outlive the
//! memory.  It is good practice to deallocate the objects in the
//! reverse order they were created in.
//!
//! ## Strings
//!
//! Strings given to this library must be zero-terminated.  Strings
//! produced by this library will be zero-terminated, allocated using
//! *malloc(3)*, and must be *free(3)* d.

#![warn(missing_docs)]

#[macro_use]
mod macros;

include!("common.rs");

pub mod core;
pub mod error;
pub mod io;
