//! Error types for patchwatch-mail

use thiserror::Error;

/// Errors that can occur while delivering a report
#[derive(Error, Debug, Clone)]
pub enum MailError {
    /// Sender or recipient address could not be parsed
    #[error("invalid address {address}: {reason}")]
    InvalidAddress {
        /// Offending address
        address: String,
        /// Parser message
        reason: String,
    },

    /// No recipients configured
    #[error("no recipients")]
    NoRecipients,

    /// Message could not be assembled
    #[error("failed to build message: {0}")]
    Build(String),

    /// SMTP relay rejected or dropped the message
    #[error("SMTP delivery failed: {0}")]
    Transport(String),

    /// Writing the report to disk failed
    #[error("I/O error: {0}")]
    Io(String),
}
