//! Write reports to disk instead of mailing them

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::MailError;
use crate::message::OutgoingReport;
use crate::traits::MailSink;

/// Writes the JSON attachment into a directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Sink writing into `dir`, created on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path the report will be written to
    #[must_use]
    pub fn path_for(&self, report: &OutgoingReport) -> PathBuf {
        self.dir.join(&report.attachment_name)
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MailSink for FileSink {
    async fn send(&self, report: &OutgoingReport) -> Result<(), MailError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MailError::Io(format!("{}: {e}", self.dir.display())))?;

        let path = self.path_for(report);
        tokio::fs::write(&path, report.attachment.as_bytes())
            .await
            .map_err(|e| MailError::Io(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), "report written");
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "file"
    }
}
