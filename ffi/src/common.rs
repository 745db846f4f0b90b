// Common code for the sequoia-ffi modules.

/* Canonical free().  */

/// Transfers ownership from C to Rust, then frees the object.
///
/// NOP if called with NULL.
macro_rules! ffi_free {
    ($name:ident) => {{
        if ! $name.is_null() {
            unsafe {
                drop(Box::from_raw($name))
            }
        }
    }};
}

/* Parameter handling.  */

/// Transfers ownership from C to Rust.
///
/// # Panics
///
/// Panics if called with NULL.
macro_rules! ffi_param_move {
    ($name:expr) => {{
        if $name.is_null() {
            panic!("Parameter {} is NULL", stringify!($name));
        }
        unsafe {
            Box::from_raw($name)
        }
    }};
}

/// Transfers a reference from C to Rust.
///
/// # Panics
///
/// Panics if called with NULL.
macro_rules! ffi_param_ref {
    ($name:ident) => {{
        if $name.is_null() {
            panic!("Parameter {} is NULL", stringify!($name));
        }
        unsafe {
            &*$name
        }
    }};
}

/// Transfers a mutable reference from C to Rust.
///
/// # Panics
///
/// Panics if called with NULL.
macro_rules! ffi_param_ref_mut {
    ($name:ident) => {{
        if $name.is_null() {
            panic!("Parameter {} is NULL", stringify!($name));
        }
        unsafe {
            &mut *$name
        }
    }};
}

/// Transfers a reference to a string from C to Rust.
///
/// # Panics
///
/// Panics if called with NULL.
macro_rules! ffi_param_cstr {
    ($name:expr) => {{
        if $name.is_null() {
            panic!("Parameter {} is NULL", stringify!($name));
        }
        unsafe {
            ::std::ffi::CStr::from_ptr($name)
        }
    }};
}

/* Return value handling.  */

/// Duplicates a string similar to strndup(3).
///
/// Returns `None` if `src` contains a 0 byte.
pub(crate) fn strndup(src: &[u8]) -> Option<*mut libc::c_char> {
    if src.contains(&0) {
        return None;
    }

    let l = src.len() + 1;
    let p = unsafe { libc::malloc(l) as *mut u8 };
    if p.is_null() {
        return None;
    }
    let s = unsafe {
        ::std::slice::from_raw_parts_mut(p, l)
    };
    s[..l - 1].copy_from_slice(src);
    s[l - 1] = 0;

    Some(p as *mut libc::c_char)
}

/// Transfers a string from Rust to C, allocating it using malloc.
///
/// # Panics
///
/// Panics if the given string contains a 0.
macro_rules! ffi_return_string {
    ($name:expr) => {{
        let string = $name;
        let bytes: &[u8] = string.as_ref();
        crate::strndup(bytes).expect(
            &format!("Returned string {} contains a 0 byte.", stringify!($name))
        )
    }};
}

/// Box, then turn into raw pointer.
///
/// This is used to transfer ownership from Rust to C.
macro_rules! box_raw {
    ($expr:expr) => {
        Box::into_raw(Box::new($expr))
    }
}

/// Implements `MoveIntoRaw` for a type handed to C as `*mut T`.
macro_rules! ffi_owned_type {
    ($t:ty) => {
        impl crate::MoveIntoRaw<*mut $t> for $t {
            fn move_into_raw(self) -> *mut $t {
                box_raw!(self)
            }
        }
    }
}

/* Error handling with implicit error return argument.  */

/// Emits local macros for error handling that use the given error
/// slot to store complex errors.
macro_rules! ffi_make_fry_from_errp {
    ($errp:expr) => {
        /// Like try! for ffi glue.
        ///
        /// Evaluates the given expression.  On success, evaluate to
        /// `Status.Success`.  On failure, stashes the error in the
        /// error slot and evaluates to the appropriate Status code.
        #[allow(unused_macros)]
        macro_rules! ffi_try_status {
            ($expr:expr) => {
                match $expr {
                    Ok(_) => crate::error::Status::Success,
                    Err(e) => {
                        use crate::MoveIntoRaw;
                        let status = crate::error::Status::from(&e);
                        if let Some(errp) = $errp {
                            *errp = e.move_into_raw();
                        }
                        status
                    },
                }
            };
        }

        /// Like try! for ffi glue.
        ///
        /// Unwraps the given expression.  On failure, stashes the
        /// error in the error slot and returns $or.
        #[allow(unused_macros)]
        macro_rules! ffi_try_or {
            ($expr:expr, $or:expr) => {
                match $expr {
                    Ok(v) => v,
                    Err(e) => {
                        use crate::MoveIntoRaw;
                        if let Some(errp) = $errp {
                            *errp = e.move_into_raw();
                        }
                        return $or;
                    },
                }
            };
        }
    }
}

/* Ownership transfer.  */

/// Moves an object from Rust to C, releasing ownership.
pub(crate) trait MoveIntoRaw<T> {
    /// Moves this object from Rust to C, releasing ownership.
    fn move_into_raw(self) -> T;
}

/// Moves an object from Rust to C, releasing ownership.
///
/// On failure, the error is stored in `errp`, and `NULL` is
/// returned.
pub(crate) trait MoveResultIntoRaw<T> {
    /// Moves this object from Rust to C, releasing ownership.
    fn move_into_raw(self, errp: Option<&mut *mut crate::error::Error>) -> T;
}

impl<T> MoveResultIntoRaw<*mut T> for ::anyhow::Result<T>
    where T: MoveIntoRaw<*mut T>
{
    fn move_into_raw(self, errp: Option<&mut *mut crate::error::Error>)
                     -> *mut T {
        match self {
            Ok(v) => v.move_into_raw(),
            Err(e) => {
                if let Some(errp) = errp {
                    *errp = e.move_into_raw();
                }
                ::std::ptr::null_mut()
            },
        }
    }
}

/// Converts a C string to a path.
///
/// On Unix, the bytes are taken verbatim.  Elsewhere, malformed
/// characters are substituted.
pub(crate) fn cstr_to_path(s: &::std::ffi::CStr) -> ::std::path::PathBuf {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        ::std::ffi::OsStr::from_bytes(s.to_bytes()).into()
    }
    #[cfg(not(unix))]
    {
        s.to_string_lossy().into_owned().into()
    }
}
