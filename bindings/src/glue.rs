//! Glue for owning native objects.
//!
//! Every native object is wrapped in an [`Owned`], which frees it
//! exactly once: either when [`Owned::release`] is called, or when
//! the wrapper is dropped, whichever comes first.  Every fallible
//! native call goes through [`invoke`], which checks the call's
//! failure sentinel and translates the error.

use std::any::Any;
use std::ffi::{CStr, CString};
use std::fmt;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::rc::Rc;

use libc::{c_char, c_void, ssize_t};

use sequoia_ffi::error::{self as native, Status};

use crate::{Error, ErrorKind, Result};

const TRACE: bool = false;

/// The function freeing a native object.
pub(crate) type Free<T> = extern "C" fn(*mut T);

/// An owned native object.
///
/// An `Owned` may hold a reference to a parent object.  The reference
/// keeps the parent alive for as long as this object exists, and is
/// never used otherwise.
pub(crate) struct Owned<T> {
    raw: Option<NonNull<T>>,
    free: Free<T>,
    name: &'static str,
    _parent: Option<Rc<dyn Any>>,
}

impl<T> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Owned")
            .field("name", &self.name)
            .field("raw", &self.raw)
            .field("parent", &self._parent.is_some())
            .finish()
    }
}

impl<T> Owned<T> {
    /// Takes ownership of `raw`.
    pub(crate) fn new(raw: NonNull<T>, free: Free<T>, name: &'static str)
                      -> Self {
        tracer!(TRACE, "Owned::new");
        t!("{} {:p}", name, raw);
        Owned {
            raw: Some(raw),
            free,
            name,
            _parent: None,
        }
    }

    /// Takes ownership of `raw` returned by a native function that
    /// cannot store an error.
    ///
    /// Fails if `raw` is `NULL`.
    pub(crate) fn from_raw(raw: *mut T, free: Free<T>, name: &'static str)
                           -> Result<Self> {
        NonNull::new(raw)
            .map(|raw| Self::new(raw, free, name))
            .ok_or_else(|| Error::new(
                ErrorKind::Unknown,
                format!("Failed to create {}", name)))
    }

    /// Calls a native constructor and takes ownership of the result.
    ///
    /// If the constructor fails, the stored error is returned.
    pub(crate) fn acquire<F>(name: &'static str, free: Free<T>, f: F)
                             -> Result<Self>
        where F: FnOnce(Option<&mut *mut native::Error>) -> *mut T
    {
        invoke(name, f).map(|raw| Self::new(raw, free, name))
    }

    /// Keeps `parent` alive for as long as this object exists.
    pub(crate) fn with_parent(mut self, parent: Rc<dyn Any>) -> Self {
        self._parent = Some(parent);
        self
    }

    /// Returns the native object for use in native calls.
    ///
    /// Fails if the object has been released.
    pub(crate) fn borrow(&self) -> Result<*mut T> {
        self.raw
            .map(NonNull::as_ptr)
            .ok_or_else(|| Error::released(self.name))
    }

    /// Frees the native object.
    ///
    /// Only the first call has an effect.
    pub(crate) fn release(&mut self) {
        tracer!(TRACE, "Owned::release");
        if let Some(raw) = self.raw.take() {
            t!("{} {:p}", self.name, raw);
            (self.free)(raw.as_ptr());
            self._parent = None;
        }
    }

    /// Returns whether the native object has been freed.
    pub(crate) fn is_released(&self) -> bool {
        self.raw.is_none()
    }
}

impl<T> Drop for Owned<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A native return value that signals failure in-band.
pub(crate) trait Sentinel {
    /// The value on success.
    type Output;

    /// Returns `None` if `self` signals failure.
    fn check(self) -> Option<Self::Output>;
}

impl<T> Sentinel for *mut T {
    type Output = NonNull<T>;

    fn check(self) -> Option<NonNull<T>> {
        NonNull::new(self)
    }
}

impl Sentinel for ssize_t {
    type Output = usize;

    fn check(self) -> Option<usize> {
        if self < 0 {
            None
        } else {
            Some(self as usize)
        }
    }
}

impl Sentinel for Status {
    type Output = ();

    fn check(self) -> Option<()> {
        if self == Status::Success {
            Some(())
        } else {
            None
        }
    }
}

/// Calls a native function with an error slot.
///
/// If the function's result signals failure, the error in the slot
/// is translated and returned.  Otherwise, the slot is not looked at.
pub(crate) fn invoke<R, F>(name: &str, f: F) -> Result<R::Output>
    where R: Sentinel,
          F: FnOnce(Option<&mut *mut native::Error>) -> R,
{
    tracer!(TRACE, "invoke");
    let mut err = ptr::null_mut();
    match f(Some(&mut err)).check() {
        Some(v) => Ok(v),
        None => {
            let e = Error::from_native(err).unwrap_or_else(|| Error::new(
                ErrorKind::Unknown,
                format!("{} failed without providing an error", name)));
            t!("{}: {}", name, e);
            Err(e)
        },
    }
}

/// Copies and frees a string allocated by the native side.
pub(crate) fn take_bytes(s: *mut c_char) -> Option<Vec<u8>> {
    if s.is_null() {
        return None;
    }
    let bytes = unsafe { CStr::from_ptr(s) }.to_bytes().to_vec();
    unsafe { libc::free(s as *mut c_void) };
    Some(bytes)
}

/// Like [`take_bytes`], but substitutes malformed characters.
pub(crate) fn take_string(s: *mut c_char) -> Option<String> {
    take_bytes(s).map(|b| String::from_utf8_lossy(&b).into_owned())
}

/// Converts a path to a C string.
pub(crate) fn path_to_cstring(path: &Path) -> Result<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path.to_str()
        .ok_or_else(|| Error::new(
            ErrorKind::InvalidArgument,
            format!("{:?} is not valid UTF-8", path)))?
        .as_bytes().to_vec();

    CString::new(bytes).map_err(|_| Error::new(
        ErrorKind::InvalidArgument,
        format!("{:?} contains a 0 byte", path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use quickcheck_macros::quickcheck;

    thread_local! {
        static FREED: Cell<usize> = Cell::new(0);
    }

    fn freed() -> usize {
        FREED.with(|f| f.get())
    }

    extern "C" fn count_free(p: *mut u32) {
        FREED.with(|f| f.set(f.get() + 1));
        unsafe { drop(Box::from_raw(p)) };
    }

    fn object(v: u32) -> Owned<u32> {
        Owned::from_raw(Box::into_raw(Box::new(v)), count_free, "u32")
            .unwrap()
    }

    #[test]
    fn drop_releases() {
        let before = freed();
        let o = object(1);
        assert!(! o.is_released());
        drop(o);
        assert_eq!(freed(), before + 1);
    }

    #[test]
    fn release_then_drop() {
        let before = freed();
        let mut o = object(2);
        o.release();
        assert!(o.is_released());
        o.release();
        drop(o);
        assert_eq!(freed(), before + 1);
    }

    #[quickcheck]
    fn release_exactly_once(n: u8) -> bool {
        let before = freed();
        let mut o = object(3);
        for _ in 0..(n as usize % 16) + 1 {
            o.release();
        }
        drop(o);
        freed() == before + 1
    }

    #[test]
    fn borrow() {
        let mut o = object(4);
        let raw = o.borrow().unwrap();
        assert_eq!(unsafe { *raw }, 4);

        o.release();
        let e = o.borrow().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidOperation);
        assert_eq!(e.message(), "u32 has been released");
    }

    #[test]
    fn null_is_rejected() {
        let before = freed();
        let e = Owned::from_raw(ptr::null_mut(), count_free, "u32")
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Unknown);
        assert_eq!(freed(), before);
    }

    #[test]
    fn acquire_translates_errors() {
        let before = freed();
        let e = Owned::<u32>::acquire("u32", count_free, |errp| {
            // Have the native side produce a genuine error.
            let r = sequoia_ffi::io::pgp_reader_from_bytes(
                errp, ptr::null(), 1);
            assert!(r.is_null());
            ptr::null_mut()
        }).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert_eq!(freed(), before);
    }

    #[test]
    fn parent_outlives_child() {
        let before = freed();
        let parent: Rc<dyn Any> = Rc::new(object(5));
        let child = object(6).with_parent(parent.clone());

        drop(parent);
        assert_eq!(freed(), before);

        drop(child);
        assert_eq!(freed(), before + 2);
    }

    #[test]
    fn release_drops_parent() {
        let before = freed();
        let parent: Rc<dyn Any> = Rc::new(object(7));
        let mut child = object(8).with_parent(parent.clone());
        drop(parent);

        child.release();
        assert_eq!(freed(), before + 2);
        drop(child);
        assert_eq!(freed(), before + 2);
    }

    #[test]
    fn invoke_sentinels() {
        assert_eq!(invoke("ok", |_| 3 as ssize_t).unwrap(), 3);
        assert_eq!(invoke("ok", |_| Status::Success).unwrap(), ());

        let e = invoke("silent", |_| -1 as ssize_t).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Unknown);
        assert_eq!(e.message(),
                   "silent failed without providing an error");
    }

    #[test]
    fn path_with_nul() {
        let e = path_to_cstring(Path::new("a\0b")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}
