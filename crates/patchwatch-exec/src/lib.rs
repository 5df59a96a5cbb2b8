//! patchwatch-exec: Remote command execution
//!
//! Runs a single "list pending updates" command on a host, either over SSH
//! or on the local machine, and reports failures in connection/execution terms.

pub mod error;
pub mod keys;
pub mod local;
pub mod result;
pub mod ssh;
pub mod traits;

pub use error::{ErrorKind, ExecError};
pub use keys::{Credential, KeyError, KeySource};
pub use local::LocalExecutor;
pub use result::{CommandResult, ConnectionInfo};
pub use ssh::SshExecutor;
pub use traits::RemoteExecutor;
