//! The finished report and its renderings

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dedupe::{DedupedEntry, HostGroup, dedupe_by_host, dedupe_by_host_set, failures};
use crate::error::CoreError;
use crate::host::{HostFailure, HostResult};

/// Entries listed in the mail body before truncating
const SUMMARY_TOP_ENTRIES: usize = 10;

/// Deduplicated pending-update report for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub hosts_total: usize,
    pub hosts_succeeded: usize,
    pub updates: Vec<DedupedEntry>,
    pub host_groups: Vec<HostGroup>,
    pub failures: Vec<HostFailure>,
}

impl Report {
    /// Build a report from collected host results
    #[must_use]
    pub fn build(results: &[HostResult], generated_at: DateTime<Utc>) -> Self {
        let updates = dedupe_by_host(results);
        let host_groups = dedupe_by_host_set(&updates);

        Self {
            generated_at,
            hosts_total: results.len(),
            hosts_succeeded: results.iter().filter(|r| r.is_success()).count(),
            updates,
            host_groups,
            failures: failures(results),
        }
    }

    /// Whether no host needs any update
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Attachment file name, e.g. `server_update_report2024-03-18.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "server_update_report{}.json",
            self.generated_at.format("%Y-%m-%d")
        )
    }

    /// Render the JSON document
    ///
    /// # Errors
    /// Returns `CoreError::Serialization` if the report cannot be rendered
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    fn headline(&self) -> String {
        format!(
            "{} pending update(s) across {} of {} host(s); {} host(s) could not be checked.",
            self.updates.len(),
            self.hosts_succeeded,
            self.hosts_total,
            self.failures.len()
        )
    }

    /// Plain-text mail body
    #[must_use]
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "This week's server update report is attached.");
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.headline());

        if !self.updates.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Most widespread updates:");
            for entry in self.updates.iter().take(SUMMARY_TOP_ENTRIES) {
                let item = &entry.update_item;
                let _ = writeln!(
                    out,
                    "  {:>4}  {} {} ({})",
                    entry.host_count, item.package_name, item.package_version, item.package_repo
                );
            }
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Hosts that could not be checked:");
            for failure in &self.failures {
                let _ = writeln!(
                    out,
                    "  {} [{}]: {}",
                    failure.hostname, failure.error, failure.message
                );
            }
        }

        out
    }

    /// HTML mail body
    #[must_use]
    pub fn summary_html(&self) -> String {
        let mut out = String::from("<html><head></head><body>");
        out.push_str("<p>This week's server update report is attached.</p>");
        let _ = write!(out, "<p>{}</p>", escape_html(&self.headline()));

        if !self.updates.is_empty() {
            out.push_str("<table><tr><th>Hosts</th><th>Package</th><th>Version</th><th>Repository</th></tr>");
            for entry in self.updates.iter().take(SUMMARY_TOP_ENTRIES) {
                let item = &entry.update_item;
                let _ = write!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    entry.host_count,
                    escape_html(&item.package_name),
                    escape_html(&item.package_version),
                    escape_html(&item.package_repo)
                );
            }
            out.push_str("</table>");
        }

        if !self.failures.is_empty() {
            out.push_str("<p>Hosts that could not be checked:</p><ul>");
            for failure in &self.failures {
                let _ = write!(
                    out,
                    "<li>{} [{}]: {}</li>",
                    escape_html(&failure.hostname),
                    failure.error,
                    escape_html(&failure.message)
                );
            }
            out.push_str("</ul>");
        }

        out.push_str("</body></html>");
        out
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use patchwatch_exec::ErrorKind;
    use patchwatch_pkg::{PackageFamily, UpdateRecord};

    use super::*;
    use crate::host::{Host, HostError};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 18, 6, 0, 0).unwrap()
    }

    fn vmtools() -> UpdateRecord {
        UpdateRecord::new("open-vm-tools.x86_64", "10.3.0-2.el7_7.1", "updates")
    }

    fn sample_results() -> Vec<HostResult> {
        vec![
            HostResult::updates(Host::new("server1", PackageFamily::Yum), vec![vmtools()]),
            HostResult::failed(
                Host::new("server2", PackageFamily::Yum),
                HostError {
                    kind: ErrorKind::Connection,
                    message: "connection failed: <refused>".to_string(),
                },
            ),
            HostResult::updates(Host::new("server3", PackageFamily::Yum), vec![vmtools()]),
        ]
    }

    #[test]
    fn test_build_counts() {
        let report = Report::build(&sample_results(), at());

        assert_eq!(report.hosts_total, 3);
        assert_eq!(report.hosts_succeeded, 2);
        assert_eq!(report.updates.len(), 1);
        assert_eq!(report.host_groups.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let report = Report::build(&sample_results(), at());
        let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

        assert_eq!(
            json["updates"][0],
            serde_json::json!({
                "update_item": {
                    "package_name": "open-vm-tools.x86_64",
                    "package_version": "10.3.0-2.el7_7.1",
                    "package_repo": "updates"
                },
                "hostnames": ["server1", "server3"],
                "host_count": 2
            })
        );
        assert_eq!(json["failures"][0]["hostname"], "server2");
        assert_eq!(json["failures"][0]["error"], "connection");
        assert_eq!(json["host_groups"][0]["update_count"], 1);
    }

    #[test]
    fn test_json_round_trip_is_stable() {
        let report = Report::build(&sample_results(), at());
        let first = report.to_json_pretty().unwrap();
        let parsed: Report = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed.to_json_pretty().unwrap(), first);
    }

    #[test]
    fn test_empty_report_is_valid() {
        let results = vec![HostResult::updates(
            Host::new("server1", PackageFamily::Apt),
            Vec::new(),
        )];
        let report = Report::build(&results, at());

        assert!(report.is_empty());
        assert!(report.failures.is_empty());
        let json = report.to_json_pretty().unwrap();
        assert!(json.contains("\"updates\": []"));
    }

    #[test]
    fn test_file_name() {
        let report = Report::build(&[], at());
        assert_eq!(report.file_name(), "server_update_report2024-03-18.json");
    }

    #[test]
    fn test_html_escapes_messages() {
        let report = Report::build(&sample_results(), at());
        let html = report.summary_html();

        assert!(html.contains("connection failed: &lt;refused&gt;"));
        assert!(html.contains("open-vm-tools.x86_64"));
        assert!(html.starts_with("<html>"));
    }

    #[test]
    fn test_text_summary() {
        let report = Report::build(&sample_results(), at());
        let text = report.summary_text();

        assert!(text.contains("1 pending update(s) across 2 of 3 host(s)"));
        assert!(text.contains("server2 [connection]"));
    }
}
