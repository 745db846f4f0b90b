//! Core functionality.
//!
//! A `Context` is the root of a Sequoia session.  It records where
//! persistent state lives and how background servers are started.
//! Everything else is conceptually scoped to a context.

#![warn(missing_docs)]

use std::convert::TryFrom;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A `&Context` for Sequoia.
///
/// # Example
///
/// A context with reasonable defaults can be created using
/// `Context::new`:
///
/// ```no_run
/// # use sequoia_core::{Context, Result};
/// # f().unwrap();
/// # fn f() -> Result<()> {
/// let c = Context::new()?;
/// # Ok(())
/// # }
/// ```
///
/// A context can be configured using the builder pattern with
/// `Context::configure`:
///
/// ```
/// # use sequoia_core::{Context, IPCPolicy, Result};
/// # f().unwrap();
/// # fn f() -> Result<()> {
/// let c = Context::configure()
/// #           .ephemeral()
///             .ipc_policy(IPCPolicy::Internal)
///             .build()?;
/// # Ok(())
/// # }
/// ```
pub struct Context {
    home: PathBuf,
    ipc_policy: IPCPolicy,
    ephemeral: bool,
    temp_dir: Option<TempDir>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("home", &self.home)
            .field("ipc_policy", &self.ipc_policy)
            .field("ephemeral", &self.ephemeral)
            .finish()
    }
}

/// Returns the default directory for shared state.
fn default_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(env::temp_dir).join(".sequoia")
}

impl Context {
    /// Creates a Context with reasonable defaults.
    pub fn new() -> Result<Self> {
        Self::configure().build()
    }

    /// Creates a Context that can be configured.
    ///
    /// The configuration is seeded like in `Context::new`, but can be
    /// modified.  A configuration has to be finalized using
    /// `.build()` in order to turn it into a Context.
    pub fn configure() -> Config {
        Config(Context {
            home: default_home(),
            ipc_policy: IPCPolicy::Robust,
            ephemeral: false,
            temp_dir: None,
        })
    }

    /// Returns the directory containing shared state.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Returns the IPC policy.
    pub fn ipc_policy(&self) -> &IPCPolicy {
        &self.ipc_policy
    }

    /// Returns whether or not this is an ephemeral context.
    pub fn ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// Represents a `Context` configuration.
///
/// You can create ephemeral context that are useful for tests and
/// one-shot programs:
///
/// ```
/// # use sequoia_core::{Context, Result};
/// # f().unwrap();
/// # fn f() -> Result<()> {
/// let c = Context::configure().ephemeral().build()?;
/// let ephemeral_home = c.home().to_path_buf();
/// // Do some tests.
/// drop(c);
/// assert!(! ephemeral_home.exists());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Config(Context);

impl Config {
    /// Finalizes the configuration and returns a `Context`.
    pub fn build(self) -> Result<Context> {
        let mut c = self.0;
        if c.ephemeral {
            let tmp = tempfile::Builder::new().prefix("sequoia").tempdir()?;
            c.home = tmp.path().to_path_buf();
            c.temp_dir = Some(tmp);
        } else {
            fs::create_dir_all(c.home())?;
        }
        Ok(c)
    }

    /// Sets the directory containing shared state.
    pub fn home<P: AsRef<Path>>(mut self, home: P) -> Self {
        self.set_home(home);
        self
    }

    /// Sets the directory containing shared state.
    pub fn set_home<P: AsRef<Path>>(&mut self, home: P) {
        self.0.home = PathBuf::new().join(home);
    }

    /// Sets the IPC policy.
    pub fn ipc_policy(mut self, policy: IPCPolicy) -> Self {
        self.set_ipc_policy(policy);
        self
    }

    /// Sets the IPC policy.
    pub fn set_ipc_policy(&mut self, policy: IPCPolicy) {
        self.0.ipc_policy = policy;
    }

    /// Makes this context ephemeral.
    pub fn ephemeral(mut self) -> Self {
        self.set_ephemeral();
        self
    }

    /// Makes this context ephemeral.
    pub fn set_ephemeral(&mut self) {
        self.0.ephemeral = true;
    }
}

/* Error handling.  */

/// Result type for Sequoia.
pub type Result<T> = ::std::result::Result<T, anyhow::Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors for Sequoia.
pub enum Error {
    /// A given argument is invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested operation is invalid.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/* IPC policy.  */

/// IPC policy for Sequoia.
///
/// With this policy you can control how Sequoia starts background
/// servers.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum IPCPolicy {
    /// External background servers only.
    ///
    /// We will always use external background servers.  If starting
    /// one fails, the operation will fail.
    ///
    /// The advantage is that we never spawn a thread.
    External,

    /// Internal background servers only.
    ///
    /// We will always use internal background servers.  It is very
    /// unlikely that this fails.
    ///
    /// The disadvantage is that we spawn a thread in your
    /// application.  Threads may play badly with `fork(2)`, file
    /// handles, and locks.
    Internal,

    /// Prefer external, fall back to internal.
    ///
    /// We will first try to use an external background server, but
    /// fall back on an internal one should that fail.
    Robust,
}

impl Default for IPCPolicy {
    fn default() -> Self {
        IPCPolicy::Robust
    }
}

impl From<IPCPolicy> for u8 {
    fn from(policy: IPCPolicy) -> Self {
        match policy {
            IPCPolicy::External => 0,
            IPCPolicy::Internal => 1,
            IPCPolicy::Robust => 2,
        }
    }
}

impl TryFrom<u8> for IPCPolicy {
    type Error = Error;

    fn try_from(policy: u8) -> ::std::result::Result<Self, Error> {
        match policy {
            0 => Ok(IPCPolicy::External),
            1 => Ok(IPCPolicy::Internal),
            2 => Ok(IPCPolicy::Robust),
            n => Err(Error::InvalidArgument(
                format!("Bad IPC policy: {}", n))),
        }
    }
}

#[macro_export]
/// Asserts that the expression matches the pattern.
macro_rules! assert_match {
    ( $error: pat = $expr:expr ) => {
        let x = $expr;
        if let $error = x {
            /* Pass.  */
        } else {
            panic!("Expected {}, got {:?}.", stringify!($error), x);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn defaults() {
        let c = Context::configure();
        assert_eq!(c.0.ipc_policy, IPCPolicy::Robust);
        assert!(! c.0.ephemeral);
        assert!(c.0.home.ends_with(".sequoia"));
    }

    #[test]
    fn ephemeral_home_is_removed() {
        let c = Context::configure().ephemeral().build().unwrap();
        assert!(c.ephemeral());
        let home = c.home().to_path_buf();
        assert!(home.is_dir());
        drop(c);
        assert!(! home.exists());
    }

    #[test]
    fn ephemeral_overrides_home() {
        let c = Context::configure()
            .home("/i/do/not/exist")
            .ephemeral()
            .build().unwrap();
        assert_ne!(c.home(), Path::new("/i/do/not/exist"));
    }

    #[test]
    fn home_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("a").join("b");
        let c = Context::configure()
            .home(&home)
            .ipc_policy(IPCPolicy::External)
            .build().unwrap();
        assert_eq!(c.home(), home);
        assert_eq!(c.ipc_policy(), &IPCPolicy::External);
        assert!(home.is_dir());
    }

    #[test]
    fn home_is_a_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let r = Context::configure().home(tmp.path()).build();
        let e = r.unwrap_err();
        assert!(e.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn bad_ipc_policy() {
        assert_match!(
            Err(Error::InvalidArgument(_)) = IPCPolicy::try_from(3u8));
    }

    quickcheck! {
        fn ipc_policy_roundtrip(n: u8) -> bool {
            match IPCPolicy::try_from(n) {
                Ok(p) => u8::from(p) == n,
                Err(Error::InvalidArgument(_)) => n > 2,
                Err(_) => false,
            }
        }
    }
}
