//! Streams.
//!
//! [`Reader`] and [`Writer`] wrap native streams created from files,
//! file descriptors, or memory.  They implement [`std::io::Read`]
//! and [`std::io::Write`], respectively.  A stream is closed when it
//! goes out of scope, or when `close` is called, whichever comes
//! first.  Using a closed stream fails without calling into the
//! native library.
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//! use sequoia_bindings::{Context, Reader, Writer};
//! # f().unwrap();
//! # fn f() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::configure().ephemeral().build()?;
//!
//! let mut w = Writer::alloc(&ctx)?;
//! w.write_all(b"hello")?;
//! let data = w.into_bytes()?;
//!
//! let mut r = Reader::from_bytes(&ctx, &data)?;
//! let mut s = String::new();
//! r.read_to_string(&mut s)?;
//! assert_eq!(s, "hello");
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use std::ptr;
use std::rc::Rc;

use libc::{c_void, size_t};

#[cfg(unix)]
use std::os::unix::io::IntoRawFd;

use sequoia_ffi::io as native;

use crate::glue::{self, invoke, Owned};
use crate::{Context, Error, ErrorKind, Result};

const TRACE: bool = false;

/// Reads from a native stream.
///
/// The lifetime `'a` is that of the memory a reader created using
/// [`Reader::from_bytes`] reads from.
#[derive(Debug)]
pub struct Reader<'a> {
    obj: Owned<native::Reader>,
    _data: PhantomData<&'a [u8]>,
}

impl Reader<'static> {
    /// Opens the file at `path`.
    pub fn open<P: AsRef<Path>>(ctx: &Context, path: P) -> Result<Self> {
        let path = glue::path_to_cstring(path.as_ref())?;
        Self::acquire(ctx.keep_alive()?, |errp| {
            native::pgp_reader_from_file(errp, path.as_ptr())
        })
    }

    /// Reads from the file descriptor `fd`.
    ///
    /// The descriptor is closed when the reader is closed, or if the
    /// reader cannot be created.
    #[cfg(unix)]
    pub fn from_fd<F: IntoRawFd>(ctx: &Context, fd: F) -> Result<Self> {
        // If this fails, `fd` is dropped and thereby closed.
        let parent = ctx.keep_alive()?;
        let fd = fd.into_raw_fd();
        Self::acquire(parent, |errp| native::pgp_reader_from_fd(errp, fd))
    }
}

impl<'a> Reader<'a> {
    /// Reads from `buf`.
    ///
    /// The buffer is not copied.
    pub fn from_bytes(ctx: &Context, buf: &'a [u8]) -> Result<Self> {
        Self::acquire(ctx.keep_alive()?, |errp| {
            native::pgp_reader_from_bytes(errp, buf.as_ptr(), buf.len())
        })
    }

    fn acquire<F>(parent: Rc<dyn Any>, f: F) -> Result<Self>
        where F: FnOnce(Option<&mut *mut sequoia_ffi::error::Error>)
                        -> *mut native::Reader
    {
        let obj = Owned::acquire("Reader", native::pgp_reader_free, f)?;
        Ok(Reader {
            obj: obj.with_parent(parent),
            _data: PhantomData,
        })
    }

    /// Closes the reader.
    ///
    /// Subsequent calls have no effect.
    pub fn close(&mut self) {
        self.obj.release();
    }

    /// Returns whether the reader has been closed.
    pub fn is_closed(&self) -> bool {
        self.obj.is_released()
    }
}

impl<'a> io::Read for Reader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reader = self.obj.borrow()?;
        Ok(invoke("pgp_reader_read", |errp| {
            native::pgp_reader_read(errp, reader, buf.as_mut_ptr(), buf.len())
        })?)
    }
}

/// Location of the buffer filled by an allocating writer.
struct Sink {
    buf: *mut c_void,
    len: size_t,
}

/// Writes to a native stream.
///
/// The lifetime `'a` is that of the memory a writer created using
/// [`Writer::from_bytes`] writes to.
pub struct Writer<'a> {
    obj: Owned<native::Writer>,
    // Only set for allocating writers.  The native writer references
    // it, so it must outlive `obj`.
    sink: *mut Sink,
    _data: PhantomData<&'a mut [u8]>,
}

impl<'a> std::fmt::Debug for Writer<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("obj", &self.obj)
            .field("alloc", &! self.sink.is_null())
            .finish()
    }
}

impl Writer<'static> {
    /// Creates or truncates the file at `path`.
    ///
    /// Writes are buffered.
    pub fn open<P: AsRef<Path>>(ctx: &Context, path: P) -> Result<Self> {
        let path = glue::path_to_cstring(path.as_ref())?;
        Self::acquire(ctx.keep_alive()?, |errp| {
            native::pgp_writer_from_file(errp, path.as_ptr())
        })
    }

    /// Writes to the file descriptor `fd`.
    ///
    /// The descriptor is closed when the writer is closed, or if the
    /// writer cannot be created.  Writes are buffered.
    #[cfg(unix)]
    pub fn from_fd<F: IntoRawFd>(ctx: &Context, fd: F) -> Result<Self> {
        // If this fails, `fd` is dropped and thereby closed.
        let parent = ctx.keep_alive()?;
        let fd = fd.into_raw_fd();
        Self::acquire(parent, |errp| native::pgp_writer_from_fd(errp, fd))
    }

    /// Writes to a growing buffer.
    ///
    /// Use [`Writer::into_bytes`] to retrieve the data.
    pub fn alloc(ctx: &Context) -> Result<Self> {
        let parent = ctx.keep_alive()?;
        let sink = Box::into_raw(Box::new(Sink {
            buf: ptr::null_mut(),
            len: 0,
        }));
        // The native constructor cannot fail, and has no error slot.
        let raw = unsafe {
            native::pgp_writer_alloc(&mut (*sink).buf, &mut (*sink).len)
        };
        match Owned::from_raw(raw, native::pgp_writer_free, "Writer") {
            Ok(obj) => Ok(Writer {
                obj: obj.with_parent(parent),
                sink,
                _data: PhantomData,
            }),
            Err(e) => {
                drop(unsafe { Box::from_raw(sink) });
                Err(e)
            },
        }
    }
}

impl<'a> Writer<'a> {
    /// Writes to `buf`.
    ///
    /// Writes fill `buf` from the start.  Once it is full, writes
    /// accept no more data.
    pub fn from_bytes(ctx: &Context, buf: &'a mut [u8]) -> Result<Self> {
        Self::acquire(ctx.keep_alive()?, |errp| {
            native::pgp_writer_from_bytes(errp, buf.as_mut_ptr(), buf.len())
        })
    }

    fn acquire<F>(parent: Rc<dyn Any>, f: F) -> Result<Self>
        where F: FnOnce(Option<&mut *mut sequoia_ffi::error::Error>)
                        -> *mut native::Writer
    {
        let obj = Owned::acquire("Writer", native::pgp_writer_free, f)?;
        Ok(Writer {
            obj: obj.with_parent(parent),
            sink: ptr::null_mut(),
            _data: PhantomData,
        })
    }

    /// Flushes and closes the writer.
    ///
    /// Errors while flushing are not reported.  Use
    /// [`io::Write::flush`] first to detect them.  Subsequent calls
    /// have no effect.
    pub fn close(&mut self) {
        tracer!(TRACE, "Writer::close");
        if let Ok(writer) = self.obj.borrow() {
            if let Err(e) = invoke("pgp_writer_flush", |errp| {
                native::pgp_writer_flush(errp, writer)
            }) {
                t!("flushing failed: {}", e);
            }
        }
        self.obj.release();
    }

    /// Returns whether the writer has been closed.
    pub fn is_closed(&self) -> bool {
        self.obj.is_released()
    }

    /// Closes the writer and returns the data written.
    ///
    /// Only writers created using [`Writer::alloc`] collect data.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        if self.sink.is_null() {
            return Err(Error::new(ErrorKind::InvalidOperation,
                                  "Writer does not collect data"));
        }
        self.close();

        let sink = unsafe { &mut *self.sink };
        let data = if sink.buf.is_null() {
            Vec::new()
        } else {
            unsafe {
                std::slice::from_raw_parts(sink.buf as *const u8, sink.len)
            }.to_vec()
        };
        Ok(data)
    }
}

impl<'a> io::Write for Writer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let writer = self.obj.borrow()?;
        Ok(invoke("pgp_writer_write", |errp| {
            native::pgp_writer_write(errp, writer, buf.as_ptr(), buf.len())
        })?)
    }

    fn flush(&mut self) -> io::Result<()> {
        let writer = self.obj.borrow()?;
        Ok(invoke("pgp_writer_flush", |errp| {
            native::pgp_writer_flush(errp, writer)
        })?)
    }
}

impl<'a> Drop for Writer<'a> {
    fn drop(&mut self) {
        self.close();
        if ! self.sink.is_null() {
            let sink = unsafe { Box::from_raw(self.sink) };
            unsafe { libc::free(sink.buf) };
        }
    }
}
