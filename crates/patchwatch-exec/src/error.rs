//! Error types for patchwatch-exec

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while running a command on a host
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to reach the remote host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication was rejected
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Command exited with a status the caller does not accept
    #[error("command execution failed: {status} - {stderr}")]
    CommandFailed {
        /// Exit status code
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// Host did not answer within the allotted time
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// SSH key error
    #[error("SSH key error: {0}")]
    SshKeyError(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error on the session channel
    #[error("I/O error: {0}")]
    IoError(String),

    /// Session not established
    #[error("not connected")]
    NotConnected,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

/// Coarse failure category reported per host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Host unreachable, authentication rejected, or timed out
    Connection,
    /// Command ran but exited abnormally
    Execution,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Connection => write!(f, "connection"),
            ErrorKind::Execution => write!(f, "execution"),
        }
    }
}

impl ExecError {
    /// Map this error onto the per-host failure category
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::ConnectionFailed(_)
            | ExecError::AuthenticationFailed(_)
            | ExecError::Timeout { .. }
            | ExecError::SshKeyError(_)
            | ExecError::NotConnected
            | ExecError::ConfigError(_) => ErrorKind::Connection,
            ExecError::CommandFailed { .. } | ExecError::SpawnError(_) | ExecError::IoError(_) => {
                ErrorKind::Execution
            }
        }
    }

    /// Whether the error came from a deadline rather than the host itself
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ExecError::ConnectionFailed("refused".into()).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            ExecError::AuthenticationFailed("denied".into()).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            ExecError::Timeout {
                timeout: Duration::from_secs(1)
            }
            .kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            ExecError::CommandFailed {
                status: 1,
                stderr: "boom".into()
            }
            .kind(),
            ErrorKind::Execution
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::Connection.to_string(), "connection");
        assert_eq!(ErrorKind::Execution.to_string(), "execution");
    }
}
