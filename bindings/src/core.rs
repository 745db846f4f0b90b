//! Contexts.
//!
//! A [`Context`] owns a native session.  It is created by finalizing
//! a [`Config`]:
//!
//! ```
//! # use sequoia_bindings::{Context, IPCPolicy, Result};
//! # f().unwrap();
//! # fn f() -> Result<()> {
//! let ctx = Context::configure()
//!     .ipc_policy(IPCPolicy::Robust)
//!     .ephemeral()
//!     .build()?;
//! assert!(ctx.ephemeral()?);
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::convert::TryFrom;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use libc::c_int;

use sequoia_ffi::core::{
    self as native,
    SQ_IPC_POLICY_EXTERNAL,
    SQ_IPC_POLICY_INTERNAL,
    SQ_IPC_POLICY_ROBUST,
};

use crate::glue::{self, Owned};
use crate::{Error, ErrorKind, Result};

/// IPC policy for Sequoia.
///
/// The policy controls how background servers are started.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum IPCPolicy {
    /// External background servers only.
    External,

    /// Internal background servers only.
    Internal,

    /// Prefer external, fall back to internal background servers.
    Robust,
}

impl Default for IPCPolicy {
    fn default() -> Self {
        IPCPolicy::Robust
    }
}

impl From<IPCPolicy> for c_int {
    fn from(p: IPCPolicy) -> Self {
        match p {
            IPCPolicy::External => SQ_IPC_POLICY_EXTERNAL,
            IPCPolicy::Internal => SQ_IPC_POLICY_INTERNAL,
            IPCPolicy::Robust => SQ_IPC_POLICY_ROBUST,
        }
    }
}

impl TryFrom<c_int> for IPCPolicy {
    type Error = Error;

    fn try_from(p: c_int) -> Result<Self> {
        match p {
            SQ_IPC_POLICY_EXTERNAL => Ok(IPCPolicy::External),
            SQ_IPC_POLICY_INTERNAL => Ok(IPCPolicy::Internal),
            SQ_IPC_POLICY_ROBUST => Ok(IPCPolicy::Robust),
            n => Err(Error::new(ErrorKind::InvalidArgument,
                                format!("Bad IPC policy: {}", n))),
        }
    }
}

/// Represents a `Context` configuration.
///
/// Nothing crosses the boundary until [`Config::build`] is called,
/// which consumes the configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    home: Option<PathBuf>,
    ipc_policy: IPCPolicy,
    ephemeral: bool,
}

impl Config {
    /// Finalizes the configuration and returns a `Context`.
    pub fn build(self) -> Result<Context> {
        // Convert first, so that nothing is allocated on the native
        // side if the path is unusable.
        let home = self.home.as_deref()
            .map(glue::path_to_cstring)
            .transpose()?;

        let cfg = native::sq_context_configure();
        if let Some(home) = home {
            native::sq_config_home(cfg, home.as_ptr());
        }
        native::sq_config_ipc_policy(cfg, self.ipc_policy.into());
        if self.ephemeral {
            native::sq_config_ephemeral(cfg);
        }

        let handle = Owned::acquire(
            "Context", native::sq_context_free,
            |errp| native::sq_config_build(errp, cfg))?;
        Ok(Context {
            handle: Some(Rc::new(handle)),
        })
    }

    /// Sets the directory containing shared state.
    pub fn home<P: AsRef<Path>>(mut self, home: P) -> Self {
        self.set_home(home);
        self
    }

    /// Sets the directory containing shared state.
    pub fn set_home<P: AsRef<Path>>(&mut self, home: P) {
        self.home = Some(home.as_ref().to_path_buf());
    }

    /// Sets the IPC policy.
    pub fn ipc_policy(mut self, policy: IPCPolicy) -> Self {
        self.set_ipc_policy(policy);
        self
    }

    /// Sets the IPC policy.
    pub fn set_ipc_policy(&mut self, policy: IPCPolicy) {
        self.ipc_policy = policy;
    }

    /// Makes this context ephemeral.
    pub fn ephemeral(mut self) -> Self {
        self.set_ephemeral();
        self
    }

    /// Makes this context ephemeral.
    pub fn set_ephemeral(&mut self) {
        self.ephemeral = true;
    }
}

/// A native Sequoia session.
///
/// The native session is freed when the context is released, or
/// dropped.  Streams created using a context keep the native session
/// alive until they are gone, even if the context has been released.
pub struct Context {
    handle: Option<Rc<Owned<native::Context>>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("handle", &self.handle)
            .finish()
    }
}

impl Context {
    /// Creates a Context with reasonable defaults.
    pub fn new() -> Result<Self> {
        Self::configure().build()
    }

    /// Creates a Context that can be configured.
    pub fn configure() -> Config {
        Config::default()
    }

    fn raw(&self) -> Result<*mut native::Context> {
        self.handle.as_ref()
            .ok_or_else(|| Error::released("Context"))?
            .borrow()
    }

    /// Returns the directory containing shared state.
    pub fn home(&self) -> Result<PathBuf> {
        let home = native::sq_context_home(self.raw()?);
        let home = glue::take_bytes(home).ok_or_else(|| Error::new(
            ErrorKind::Unknown, "sq_context_home returned NULL"))?;

        #[cfg(unix)]
        let home = {
            use std::os::unix::ffi::OsStringExt;
            PathBuf::from(std::ffi::OsString::from_vec(home))
        };
        #[cfg(not(unix))]
        let home = PathBuf::from(String::from_utf8_lossy(&home).into_owned());
        Ok(home)
    }

    /// Returns the IPC policy.
    pub fn ipc_policy(&self) -> Result<IPCPolicy> {
        IPCPolicy::try_from(native::sq_context_ipc_policy(self.raw()?))
    }

    /// Returns whether or not this is an ephemeral context.
    pub fn ephemeral(&self) -> Result<bool> {
        Ok(native::sq_context_ephemeral(self.raw()?))
    }

    /// Releases this context.
    ///
    /// The native session is freed once no stream created from this
    /// context remains.  Subsequent calls have no effect.
    pub fn release(&mut self) {
        self.handle = None;
    }

    /// Returns whether this context has been released.
    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Returns a reference that keeps the native session alive.
    pub(crate) fn keep_alive(&self) -> Result<Rc<dyn Any>> {
        let handle = self.handle.as_ref()
            .ok_or_else(|| Error::released("Context"))?;
        Ok(handle.clone() as Rc<dyn Any>)
    }
}
