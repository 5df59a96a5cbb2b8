//! Mail sink trait

use async_trait::async_trait;

use crate::error::MailError;
use crate::message::OutgoingReport;

/// Destination for a finished report
#[async_trait]
pub trait MailSink: Send + Sync {
    /// Deliver the report; a single attempt, no retries
    async fn send(&self, report: &OutgoingReport) -> Result<(), MailError>;

    /// Short name used in logs
    fn sink_type(&self) -> &'static str;
}
