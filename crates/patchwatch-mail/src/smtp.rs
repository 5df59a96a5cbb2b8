//! SMTP delivery using lettre

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::MailError;
use crate::message::OutgoingReport;
use crate::traits::MailSink;

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpSecurity {
    /// TLS from the first byte (SMTPS, usually port 465)
    #[default]
    Implicit,
    /// Plain connection upgraded with STARTTLS (usually port 587)
    StartTls,
}

/// SMTP relay settings
#[derive(Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: SmtpSecurity,
    pub timeout: Duration,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SmtpSettings {
    /// Settings for an SMTPS relay on port 465
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port: 465,
            username: username.into(),
            password: password.into(),
            security: SmtpSecurity::Implicit,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Sends reports through an authenticated SMTP relay
pub struct SmtpMailer {
    settings: SmtpSettings,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    /// Create a mailer; no connection is made until the first send
    ///
    /// # Errors
    /// Returns `MailError::Transport` if the relay address is unusable
    pub fn new(settings: SmtpSettings) -> Result<Self, MailError> {
        let builder = match settings.security {
            SmtpSecurity::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.server),
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
            }
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        Ok(Self {
            settings,
            transport,
        })
    }

    /// Assemble the MIME message: text/html alternative plus JSON attachment
    ///
    /// # Errors
    /// Returns `MailError::InvalidAddress` for unparsable addresses,
    /// `MailError::NoRecipients` if `to` is empty
    pub fn build_message(report: &OutgoingReport) -> Result<Message, MailError> {
        let envelope = &report.envelope;
        if envelope.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(&envelope.from)?)
            .subject(envelope.subject.clone());
        for to in &envelope.to {
            builder = builder.to(parse_mailbox(to)?);
        }

        let json = ContentType::parse("application/json")
            .map_err(|e| MailError::Build(e.to_string()))?;
        let attachment =
            Attachment::new(report.attachment_name.clone()).body(report.attachment.clone(), json);

        builder
            .multipart(
                MultiPart::mixed()
                    .multipart(MultiPart::alternative_plain_html(
                        report.text_body.clone(),
                        report.html_body.clone(),
                    ))
                    .singlepart(attachment),
            )
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl MailSink for SmtpMailer {
    #[instrument(skip_all, fields(server = %self.settings.server, port = self.settings.port))]
    async fn send(&self, report: &OutgoingReport) -> Result<(), MailError> {
        let message = Self::build_message(report)?;

        debug!(recipients = report.envelope.to.len(), "sending report");

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!(
            code = %response.code(),
            recipients = report.envelope.to.len(),
            "report mailed"
        );
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "smtp"
    }
}
