//! Contexts.
//!
//! Sequoia tries to be useful for a wide variety of applications.
//! Therefore, we need you to provide a little information about the
//! context you are using Sequoia in.
//!
//! # Example
//!
//! A context can be configured using the builder pattern with
//! `sq_context_configure`:
//!
//! ```text
//! pgp_error_t err;
//! sq_config_t cfg;
//! sq_context_t ctx;
//!
//! cfg = sq_context_configure ();
//! sq_config_ipc_policy (cfg, SQ_IPC_POLICY_ROBUST);
//! sq_config_ephemeral (cfg);
//! ctx = sq_config_build (&err, cfg);
//! if (ctx == NULL)
//!   error (1, 0, "sq_config_build: %s", pgp_error_to_string (err));
//!
//! sq_context_free (ctx);
//! ```

use std::convert::TryFrom;
use libc::{c_char, c_int};

use sequoia_core as core;

use crate::MoveResultIntoRaw;

/// Use external background servers only.
pub const SQ_IPC_POLICY_EXTERNAL: c_int = 0;
/// Use internal background servers only.
pub const SQ_IPC_POLICY_INTERNAL: c_int = 1;
/// Prefer external background servers, fall back to internal ones.
pub const SQ_IPC_POLICY_ROBUST: c_int = 2;

/// Wraps a Context.
#[derive(Debug)]
pub struct Context(core::Context);
ffi_owned_type!(Context);

/// Wraps a Config and provides an error slot.
///
/// Setters cannot fail.  Invalid arguments are remembered and
/// reported by `sq_config_build`.
#[derive(Debug)]
pub struct Config {
    c: core::Config,
    e: Option<::anyhow::Error>,
}

impl Config {
    fn stash(&mut self, e: ::anyhow::Error) {
        if self.e.is_none() {
            self.e = Some(e);
        }
    }
}

/// Creates a Context that can be configured.
///
/// The configuration is seeded with reasonable defaults, but can be
/// modified.  A configuration has to be finalized using
/// `sq_config_build()` in order to turn it into a Context.
#[no_mangle] pub extern "C"
fn sq_context_configure() -> *mut Config {
    box_raw!(Config {
        c: core::Context::configure(),
        e: None,
    })
}

/// Frees a context.
#[no_mangle] pub extern "C"
fn sq_context_free(context: *mut Context) {
    ffi_free!(context)
}

/// Returns the directory containing shared state.
///
/// The returned value must be freed with `free(3)`.
#[no_mangle] pub extern "C"
fn sq_context_home(ctx: *const Context) -> *mut c_char {
    let ctx = ffi_param_ref!(ctx);
    let home = ctx.0.home();
    #[cfg(unix)]
    let home = {
        use std::os::unix::ffi::OsStrExt;
        home.as_os_str().as_bytes()
    };
    #[cfg(not(unix))]
    let home = home.to_string_lossy().into_owned();
    ffi_return_string!(home)
}

/// Returns the IPC policy.
#[no_mangle] pub extern "C"
fn sq_context_ipc_policy(ctx: *const Context) -> c_int {
    let ctx = ffi_param_ref!(ctx);
    u8::from(*ctx.0.ipc_policy()) as c_int
}

/// Returns whether or not this is an ephemeral context.
#[no_mangle] pub extern "C"
fn sq_context_ephemeral(ctx: *const Context) -> bool {
    let ctx = ffi_param_ref!(ctx);
    ctx.0.ephemeral()
}


/*  sequoia::Config.  */

/// Finalizes the configuration and return a `Context`.
///
/// Consumes `cfg`.  Returns `NULL` on errors.
#[no_mangle] pub extern "C"
fn sq_config_build(errp: Option<&mut *mut crate::error::Error>,
                   cfg: *mut Config)
                   -> *mut Context {
    let cfg = ffi_param_move!(cfg);
    let Config { c, e } = *cfg;

    let ctx = match e {
        Some(e) => Err(e),
        None => c.build().map(Context),
    };
    ctx.move_into_raw(errp)
}

/// Sets the directory containing shared state.
#[no_mangle] pub extern "C"
fn sq_config_home(cfg: *mut Config, home: *const c_char) {
    let cfg = ffi_param_ref_mut!(cfg);
    let home = crate::cstr_to_path(ffi_param_cstr!(home));
    cfg.c.set_home(home)
}

/// Sets the IPC policy.
///
/// An invalid policy is reported by `sq_config_build`.
#[no_mangle] pub extern "C"
fn sq_config_ipc_policy(cfg: *mut Config, policy: c_int) {
    let cfg = ffi_param_ref_mut!(cfg);
    let policy = u8::try_from(policy)
        .map_err(|_| core::Error::InvalidArgument(
            format!("Bad IPC policy: {}", policy)))
        .and_then(core::IPCPolicy::try_from);
    match policy {
        Ok(p) => cfg.c.set_ipc_policy(p),
        Err(e) => cfg.stash(e.into()),
    }
}

/// Makes this context ephemeral.
#[no_mangle] pub extern "C"
fn sq_config_ephemeral(cfg: *mut Config) {
    let cfg = ffi_param_ref_mut!(cfg);
    cfg.c.set_ephemeral();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};
    use std::path::Path;
    use std::ptr;

    use crate::error::{pgp_error_free, pgp_error_status, Status};

    fn take_string(s: *mut c_char) -> String {
        assert!(! s.is_null());
        let r = unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned();
        unsafe { libc::free(s as *mut libc::c_void) };
        r
    }

    #[test]
    fn build_ephemeral() {
        let cfg = sq_context_configure();
        sq_config_ipc_policy(cfg, SQ_IPC_POLICY_INTERNAL);
        sq_config_ephemeral(cfg);

        let mut err = ptr::null_mut();
        let ctx = sq_config_build(Some(&mut err), cfg);
        assert!(! ctx.is_null());
        assert!(err.is_null());

        assert_eq!(sq_context_ipc_policy(ctx), SQ_IPC_POLICY_INTERNAL);
        assert!(sq_context_ephemeral(ctx));
        let home = take_string(sq_context_home(ctx));
        assert!(Path::new(&home).is_dir());

        sq_context_free(ctx);
        assert!(! Path::new(&home).exists());
    }

    #[test]
    fn build_with_home() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("state");
        let c_home = CString::new(home.to_str().unwrap()).unwrap();

        let cfg = sq_context_configure();
        sq_config_home(cfg, c_home.as_ptr());
        let ctx = sq_config_build(None, cfg);
        assert!(! ctx.is_null());
        assert_eq!(sq_context_ipc_policy(ctx), SQ_IPC_POLICY_ROBUST);
        assert!(! sq_context_ephemeral(ctx));
        assert_eq!(take_string(sq_context_home(ctx)),
                   home.to_str().unwrap());
        assert!(home.is_dir());
        sq_context_free(ctx);
    }

    #[test]
    fn bad_ipc_policy_fails_at_build() {
        for &bad in &[-1, 3, 1000] {
            let cfg = sq_context_configure();
            sq_config_ipc_policy(cfg, bad);
            sq_config_ipc_policy(cfg, SQ_IPC_POLICY_EXTERNAL);
            sq_config_ephemeral(cfg);

            let mut err = ptr::null_mut();
            let ctx = sq_config_build(Some(&mut err), cfg);
            assert!(ctx.is_null());
            assert!(! err.is_null());
            assert_eq!(pgp_error_status(err), Status::InvalidArgument);
            pgp_error_free(err);
        }
    }

    #[test]
    fn unusable_home() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let c_home = CString::new(file.path().to_str().unwrap()).unwrap();

        let cfg = sq_context_configure();
        sq_config_home(cfg, c_home.as_ptr());
        let mut err = ptr::null_mut();
        let ctx = sq_config_build(Some(&mut err), cfg);
        assert!(ctx.is_null());
        assert_eq!(pgp_error_status(err), Status::IoError);
        pgp_error_free(err);
    }

    #[test]
    fn free_null() {
        sq_context_free(ptr::null_mut());
    }
}
