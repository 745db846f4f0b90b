//! Safe, owned wrappers around Sequoia's C API.
//!
//! Sequoia's C API hands out raw pointers to opaque objects, signals
//! failure in-band, and leaves freeing objects to the caller.  This
//! crate wraps these objects so that the usual Rust rules apply:
//!
//!   - Every object is owned by exactly one value, and freed exactly
//!     once, when the value is released or dropped.
//!   - Fallible operations return [`Result`], and native errors are
//!     translated into [`Error`]s.
//!   - Streams implement [`std::io::Read`] and [`std::io::Write`].
//!
//! # Example
//!
//! ```
//! use std::io::Read;
//! use sequoia_bindings::{Context, IPCPolicy, Reader, Writer};
//! # f().unwrap();
//! # fn f() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::configure()
//!     .ipc_policy(IPCPolicy::Robust)
//!     .ephemeral()
//!     .build()?;
//!
//! {
//!     let _w = Writer::from_bytes(&ctx, &mut [])?;
//! }
//!
//! let mut r = Reader::from_bytes(&ctx, b"hello")?;
//! let mut buf = [0; 5];
//! assert_eq!(r.read(&mut buf)?, 5);
//! assert_eq!(r.read(&mut buf)?, 0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod glue;

pub mod core;
pub mod error;
pub mod io;

pub use crate::core::{Config, Context, IPCPolicy};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::io::{Reader, Writer};
