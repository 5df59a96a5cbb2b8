//! End-to-end audit run: collect, deduplicate, build the report

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use patchwatch_pkg::PackageFamily;

use crate::collector::{Collector, ExecutorFactory};
use crate::config::AuditConfig;
use crate::error::CoreError;
use crate::report::Report;

/// Run one audit over every configured host
///
/// # Errors
/// Returns `CoreError::NoHosts` if nothing is configured and
/// `CoreError::NoReachableHosts` if every host failed. Partial failures
/// are part of the returned report.
#[instrument(skip_all)]
pub async fn run_audit(
    config: &AuditConfig,
    factory: Arc<dyn ExecutorFactory>,
) -> Result<Report, CoreError> {
    if config.hosts.is_empty() {
        return Err(CoreError::NoHosts);
    }

    for family in PackageFamily::ALL {
        if config.host_count(family) == 0 {
            info!(family = %family, "no {family} servers configured");
        }
    }

    let collector = Collector::from_config(factory, config);
    let results = collector.collect(&config.hosts).await;
    let report = Report::build(&results, Utc::now());

    if report.hosts_succeeded == 0 {
        warn!(failed = report.failures.len(), "no host could be checked");
        return Err(CoreError::NoReachableHosts {
            failed: report.failures.len(),
        });
    }

    info!(
        updates = report.updates.len(),
        host_groups = report.host_groups.len(),
        failures = report.failures.len(),
        "report built"
    );

    Ok(report)
}
