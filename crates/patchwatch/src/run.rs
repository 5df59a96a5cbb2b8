//! One audit run: configure, collect, report, deliver

use std::path::PathBuf;
use std::sync::Arc;

use eyre::WrapErr;
use tracing::{info, warn};

use patchwatch_core::{SshExecutorFactory, run_audit};
use patchwatch_mail::{FileSink, MailSink, OutgoingReport, SmtpMailer};

use crate::exit::invalid_config;
use crate::{Cli, config, init_tracing};

/// Execute the run described by the command line
///
/// # Errors
/// Configuration problems are tagged for exit code 2; zero reachable hosts,
/// serialization and delivery failures are returned as plain errors.
pub async fn run(cli: &Cli) -> eyre::Result<()> {
    let settings = config::load(cli.config.as_deref(), !cli.no_mail, |name| {
        std::env::var(name).ok()
    })
    .map_err(invalid_config)?;

    let level = cli
        .log_level
        .as_deref()
        .or(settings.log_level.as_deref())
        .unwrap_or("info");
    init_tracing(level, cli.log_format);

    match &settings.source {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => warn!("no config file found, using environment only"),
    }

    let credential = settings
        .key
        .load()
        .wrap_err("failed to load SSH key")
        .map_err(invalid_config)?;
    let factory = Arc::new(SshExecutorFactory::new(settings.audit.ssh.clone(), credential));

    let report = run_audit(&settings.audit, factory).await?;
    let outgoing = OutgoingReport::render(&report, settings.envelope.clone())?;

    if cli.print {
        println!("{}", outgoing.attachment);
    }

    let mut sinks: Vec<Box<dyn MailSink>> = Vec::new();
    let output_dir = cli
        .output
        .clone()
        .or_else(|| cli.no_mail.then(|| PathBuf::from(".")));
    if let Some(dir) = output_dir {
        sinks.push(Box::new(FileSink::new(dir)));
    }
    if let Some(smtp) = settings.smtp {
        sinks.push(Box::new(SmtpMailer::new(smtp)?));
    }

    for sink in &sinks {
        sink.send(&outgoing)
            .await
            .wrap_err_with(|| format!("{} delivery failed", sink.sink_type()))?;
        info!(sink = sink.sink_type(), "report delivered");
    }

    info!(
        updates = report.updates.len(),
        failures = report.failures.len(),
        "audit complete"
    );
    Ok(())
}
