//! Transport-neutral outgoing message

use serde::{Deserialize, Serialize};

use patchwatch_core::{CoreError, Report};

/// Default subject line
pub const DEFAULT_SUBJECT: &str = "Pending Server Updates";

/// Sender, recipients and subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
}

impl Envelope {
    /// Envelope with the default subject
    pub fn new(from: impl Into<String>, to: Vec<String>) -> Self {
        Self {
            from: from.into(),
            to,
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }

    /// Override the subject
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }
}

/// A rendered report ready for any sink
#[derive(Debug, Clone)]
pub struct OutgoingReport {
    pub envelope: Envelope,
    pub text_body: String,
    pub html_body: String,
    /// File name of the JSON attachment
    pub attachment_name: String,
    /// JSON document
    pub attachment: String,
}

impl OutgoingReport {
    /// Render a report for delivery
    ///
    /// # Errors
    /// Returns `CoreError::Serialization` if the JSON document cannot be built
    pub fn render(report: &Report, envelope: Envelope) -> Result<Self, CoreError> {
        Ok(Self {
            envelope,
            text_body: report.summary_text(),
            html_body: report.summary_html(),
            attachment_name: report.file_name(),
            attachment: report.to_json_pretty()?,
        })
    }
}
