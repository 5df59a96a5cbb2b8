//! patchwatch-mail: Report delivery
//!
//! Wraps a finished report into a message and hands it to a sink: an SMTP
//! relay over TLS, or a directory on disk.

pub mod error;
pub mod file;
pub mod message;
pub mod smtp;
pub mod traits;

pub use error::MailError;
pub use file::FileSink;
pub use message::{Envelope, OutgoingReport};
pub use smtp::{SmtpMailer, SmtpSecurity, SmtpSettings};
pub use traits::MailSink;
