//! IO primitives for Sequoia.
//!
//! Readers and writers can be created from files, file descriptors,
//! and memory.  Both are freed using `pgp_reader_free` and
//! `pgp_writer_free`, respectively.  Freeing a writer flushes it.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::slice;
use libc::{c_char, c_int, c_void, size_t, ssize_t, realloc};

#[cfg(unix)]
use std::os::unix::io::FromRawFd;

use sequoia_core as core;

use crate::MoveIntoRaw;
use crate::MoveResultIntoRaw;
use crate::error::Status;

const TRACE: bool = false;

/// Wraps a generic reader.
pub struct Reader(Box<dyn io::Read>);
ffi_owned_type!(Reader);

impl Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// Borrows `len` bytes at `buf`.
///
/// `buf` may only be `NULL` if `len` is zero.
fn buffer<'a>(buf: *const u8, len: size_t) -> ::anyhow::Result<&'a [u8]> {
    if len == 0 {
        Ok(&[])
    } else if buf.is_null() {
        Err(core::Error::InvalidArgument(
            format!("buf is NULL, but len is {}", len)).into())
    } else {
        Ok(unsafe { slice::from_raw_parts(buf, len as usize) })
    }
}

/// Borrows `len` bytes at `buf` mutably.
///
/// `buf` may only be `NULL` if `len` is zero.
fn buffer_mut<'a>(buf: *mut u8, len: size_t)
                  -> ::anyhow::Result<&'a mut [u8]> {
    if len == 0 {
        Ok(Default::default())
    } else if buf.is_null() {
        Err(core::Error::InvalidArgument(
            format!("buf is NULL, but len is {}", len)).into())
    } else {
        Ok(unsafe { slice::from_raw_parts_mut(buf, len as usize) })
    }
}

/// Checks that `fd` may be a file descriptor.
fn descriptor(fd: c_int) -> ::anyhow::Result<c_int> {
    if fd < 0 {
        Err(core::Error::InvalidArgument(
            format!("Bad file descriptor: {}", fd)).into())
    } else {
        Ok(fd)
    }
}

/// Opens a file returning a reader.
///
/// Returns `NULL` on errors.
#[no_mangle] pub extern "C"
fn pgp_reader_from_file(errp: Option<&mut *mut crate::error::Error>,
                        filename: *const c_char)
                        -> *mut Reader {
    tracer!(TRACE, "pgp_reader_from_file");
    let filename = crate::cstr_to_path(ffi_param_cstr!(filename));
    t!("{:?}", filename);
    File::open(&filename)
        .map(|r| Reader(Box::new(r)))
        .map_err(::anyhow::Error::from)
        .move_into_raw(errp)
}

/// Opens a file descriptor returning a reader.
///
/// Takes ownership of `fd`, which is closed when the reader is
/// freed.  Returns `NULL` on errors.
#[cfg(unix)]
#[no_mangle] pub extern "C"
fn pgp_reader_from_fd(errp: Option<&mut *mut crate::error::Error>,
                      fd: c_int)
                      -> *mut Reader {
    descriptor(fd)
        .map(|fd| Reader(Box::new(unsafe { File::from_raw_fd(fd) })))
        .move_into_raw(errp)
}

/// Creates a reader from a buffer.
///
/// The buffer is not copied, and must outlive the reader.  Returns
/// `NULL` on errors.
#[no_mangle] pub extern "C"
fn pgp_reader_from_bytes(errp: Option<&mut *mut crate::error::Error>,
                         buf: *const u8, len: size_t)
                         -> *mut Reader {
    buffer(buf, len)
        .map(|buf| Reader(Box::new(Cursor::new(buf))))
        .move_into_raw(errp)
}

/// Frees a reader.
#[no_mangle] pub extern "C"
fn pgp_reader_free(reader: *mut Reader) {
    ffi_free!(reader)
}

/// Reads up to `len` bytes into `buf`.
///
/// Returns the number of bytes read, 0 at the end of the stream, or
/// -1 on errors.
#[no_mangle] pub extern "C"
fn pgp_reader_read(errp: Option<&mut *mut crate::error::Error>,
                   reader: *mut Reader,
                   buf: *mut u8, len: size_t)
                   -> ssize_t {
    ffi_make_fry_from_errp!(errp);
    let reader = ffi_param_ref_mut!(reader);
    let buf = ffi_try_or!(buffer_mut(buf, len), -1);
    let n = ffi_try_or!(reader.read(buf).map_err(::anyhow::Error::from), -1);
    n as ssize_t
}

/// Wraps a generic writer.
pub struct Writer(Box<dyn io::Write>);
ffi_owned_type!(Writer);

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Opens a file returning a writer.
///
/// The file will be created if it does not exist, or be truncated
/// otherwise.  If you need more control, use `pgp_writer_from_fd`.
/// Writes are buffered.  Returns `NULL` on errors.
#[no_mangle] pub extern "C"
fn pgp_writer_from_file(errp: Option<&mut *mut crate::error::Error>,
                        filename: *const c_char)
                        -> *mut Writer {
    tracer!(TRACE, "pgp_writer_from_file");
    let filename = crate::cstr_to_path(ffi_param_cstr!(filename));
    t!("{:?}", filename);
    File::create(&filename)
        .map(|w| Writer(Box::new(BufWriter::new(w))))
        .map_err(::anyhow::Error::from)
        .move_into_raw(errp)
}

/// Opens a file descriptor returning a writer.
///
/// Takes ownership of `fd`, which is closed when the writer is
/// freed.  Writes are buffered.  Returns `NULL` on errors.
#[cfg(unix)]
#[no_mangle] pub extern "C"
fn pgp_writer_from_fd(errp: Option<&mut *mut crate::error::Error>,
                      fd: c_int)
                      -> *mut Writer {
    descriptor(fd)
        .map(|fd| Writer(Box::new(BufWriter::new(unsafe {
            File::from_raw_fd(fd)
        }))))
        .move_into_raw(errp)
}

/// Creates a writer from a buffer.
///
/// Writes fill `buf` from the start.  Once `len` bytes have been
/// written, further writes accept no data.  The buffer must outlive
/// the writer.  Returns `NULL` on errors.
#[no_mangle] pub extern "C"
fn pgp_writer_from_bytes(errp: Option<&mut *mut crate::error::Error>,
                         buf: *mut u8, len: size_t)
                         -> *mut Writer {
    buffer_mut(buf, len)
        .map(|buf| Writer(Box::new(Cursor::new(buf))))
        .move_into_raw(errp)
}

/// Creates an allocating writer.
///
/// This writer allocates memory using `malloc`, and stores the
/// pointer to the memory and the number of bytes written to the given
/// locations `buf`, and `len`.  Both must either be set to zero, or
/// reference a chunk of memory allocated using libc's heap allocator.
/// The caller is responsible to `free` it once the writer has been
/// destroyed.
#[no_mangle] pub extern "C"
fn pgp_writer_alloc(buf: *mut *mut c_void, len: *mut size_t)
                    -> *mut Writer {
    let buf = ffi_param_ref_mut!(buf);
    let len = ffi_param_ref_mut!(len);

    Writer(Box::new(WriterAlloc {
        buf,
        len,
    })).move_into_raw()
}

struct WriterAlloc {
    buf: &'static mut *mut c_void,
    len: &'static mut size_t,
}

impl Write for WriterAlloc {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let old_len = *self.len;
        let new_len = old_len + buf.len();

        let new = unsafe {
            realloc(*self.buf, new_len)
        };
        if new.is_null() {
            return Err(io::Error::new(io::ErrorKind::Other, "out of memory"));
        }

        *self.buf = new;
        *self.len = new_len;

        let sl = unsafe {
            slice::from_raw_parts_mut(new as *mut u8, new_len)
        };
        sl[old_len..].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Do nothing.
        Ok(())
    }
}

/// Writes up to `len` bytes of `buf` into `writer`.
///
/// Returns the number of bytes written, or -1 on errors.
#[no_mangle] pub extern "C"
fn pgp_writer_write(errp: Option<&mut *mut crate::error::Error>,
                    writer: *mut Writer,
                    buf: *const u8, len: size_t)
                    -> ssize_t {
    ffi_make_fry_from_errp!(errp);
    let writer = ffi_param_ref_mut!(writer);
    let buf = ffi_try_or!(buffer(buf, len), -1);
    let n = ffi_try_or!(writer.write(buf).map_err(::anyhow::Error::from), -1);
    n as ssize_t
}

/// Flushes `writer`.
#[no_mangle] pub extern "C"
fn pgp_writer_flush(errp: Option<&mut *mut crate::error::Error>,
                    writer: *mut Writer)
                    -> Status {
    ffi_make_fry_from_errp!(errp);
    let writer = ffi_param_ref_mut!(writer);
    ffi_try_status!(writer.flush().map_err(::anyhow::Error::from))
}

/// Frees a writer.
///
/// Pending data is flushed.  Errors are silently dropped; use
/// `pgp_writer_flush` first to detect them.
#[no_mangle] pub extern "C"
fn pgp_writer_free(writer: *mut Writer) {
    tracer!(TRACE, "pgp_writer_free");
    if writer.is_null() {
        return;
    }
    let mut writer = unsafe { Box::from_raw(writer) };
    if let Err(e) = writer.flush() {
        t!("flushing failed: {}", e);
    }
    drop(writer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    use crate::error::{pgp_error_free, pgp_error_status};

    #[test]
    fn read_from_bytes() {
        let data = b"hello world";
        let r = pgp_reader_from_bytes(None, data.as_ptr(), data.len());
        assert!(! r.is_null());

        let mut buf = [0u8; 4];
        let mut got = Vec::new();
        loop {
            let n = pgp_reader_read(None, r, buf.as_mut_ptr(), buf.len());
            assert!(n >= 0);
            if n == 0 {
                break;
            }
            got.extend_from_slice(&buf[..n as usize]);
        }
        assert_eq!(&got[..], &data[..]);
        pgp_reader_free(r);
    }

    #[test]
    fn empty_buffers() {
        let r = pgp_reader_from_bytes(None, ptr::null(), 0);
        assert!(! r.is_null());
        assert_eq!(pgp_reader_read(None, r, ptr::null_mut(), 0), 0);
        pgp_reader_free(r);

        let w = pgp_writer_from_bytes(None, ptr::null_mut(), 0);
        assert!(! w.is_null());
        assert_eq!(pgp_writer_write(None, w, b"x".as_ptr(), 1), 0);
        pgp_writer_free(w);
    }

    #[test]
    fn null_buffer_with_length() {
        let mut err = ptr::null_mut();
        let r = pgp_reader_from_bytes(Some(&mut err), ptr::null(), 3);
        assert!(r.is_null());
        assert_eq!(pgp_error_status(err), Status::InvalidArgument);
        pgp_error_free(err);
    }

    #[test]
    fn missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let name = CString::new(
            tmp.path().join("missing").to_str().unwrap()).unwrap();

        let mut err = ptr::null_mut();
        let r = pgp_reader_from_file(Some(&mut err), name.as_ptr());
        assert!(r.is_null());
        assert!(! err.is_null());
        assert_eq!(pgp_error_status(err), Status::IoError);
        pgp_error_free(err);
    }

    #[cfg(unix)]
    #[test]
    fn bad_descriptor() {
        let mut err = ptr::null_mut();
        let r = pgp_reader_from_fd(Some(&mut err), -1);
        assert!(r.is_null());
        assert_eq!(pgp_error_status(err), Status::InvalidArgument);
        pgp_error_free(err);

        let mut err = ptr::null_mut();
        let w = pgp_writer_from_fd(Some(&mut err), -1);
        assert!(w.is_null());
        assert_eq!(pgp_error_status(err), Status::InvalidArgument);
        pgp_error_free(err);
    }

    #[test]
    fn write_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out");
        let name = CString::new(path.to_str().unwrap()).unwrap();

        let w = pgp_writer_from_file(None, name.as_ptr());
        assert!(! w.is_null());
        assert_eq!(pgp_writer_write(None, w, b"abc".as_ptr(), 3), 3);
        assert_eq!(pgp_writer_flush(None, w), Status::Success);
        assert_eq!(pgp_writer_write(None, w, b"def".as_ptr(), 3), 3);
        pgp_writer_free(w);

        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[test]
    fn write_to_bytes() {
        let mut buf = [0u8; 4];
        let w = pgp_writer_from_bytes(None, buf.as_mut_ptr(), buf.len());
        assert_eq!(pgp_writer_write(None, w, b"abc".as_ptr(), 3), 3);
        assert_eq!(pgp_writer_write(None, w, b"def".as_ptr(), 3), 1);
        assert_eq!(pgp_writer_write(None, w, b"ghi".as_ptr(), 3), 0);
        pgp_writer_free(w);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn write_alloc() {
        let mut buf: *mut c_void = ptr::null_mut();
        let mut len: size_t = 0;
        let w = pgp_writer_alloc(&mut buf, &mut len);
        assert_eq!(pgp_writer_write(None, w, b"foo".as_ptr(), 3), 3);
        assert_eq!(pgp_writer_write(None, w, b"bar".as_ptr(), 3), 3);
        pgp_writer_free(w);

        assert_eq!(len, 6);
        let got = unsafe { slice::from_raw_parts(buf as *const u8, len) };
        assert_eq!(got, b"foobar");
        unsafe { libc::free(buf) };
    }

    #[test]
    fn free_null() {
        pgp_reader_free(ptr::null_mut());
        pgp_writer_free(ptr::null_mut());
    }
}
