//! APT output parsing (Debian/Ubuntu)

use tracing::debug;

use crate::traits::PackageParser;
use crate::types::{PackageFamily, UpdateRecord};

/// Parser for `apt list --upgradable`
#[derive(Debug, Clone, Copy, Default)]
pub struct AptParser;

impl AptParser {
    /// Parse one listing line
    ///
    /// Format: `name/repo version arch [upgradable from: old]`
    /// Example: `systemd/bionic-updates 237-3ubuntu10.33 amd64 [upgradable from: 237-3ubuntu10.31]`
    fn parse_line(line: &str) -> Option<UpdateRecord> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return None;
        }
        if parts.len() > 3 && !parts[3].starts_with('[') {
            return None;
        }

        let (name, repo) = parts[0].split_once('/')?;
        if name.is_empty() || repo.is_empty() {
            return None;
        }

        Some(UpdateRecord::new(name, parts[1], repo))
    }
}

impl PackageParser for AptParser {
    fn family(&self) -> PackageFamily {
        PackageFamily::Apt
    }

    fn parse(&self, output: &str) -> Vec<UpdateRecord> {
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for line in output.lines() {
            // Skip header lines and empty lines
            if line.trim().is_empty() || line.starts_with("Listing") || line.starts_with("WARNING")
            {
                continue;
            }

            match Self::parse_line(line) {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    debug!(line = %line, "skipping unrecognized apt line");
                }
            }
        }

        debug!(count = records.len(), skipped, "parsed apt output");
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upgradable() {
        let output = r"
WARNING: apt does not have a stable CLI interface. Use with caution in scripts.

Listing...
systemd/bionic-updates 237-3ubuntu10.33 amd64 [upgradable from: 237-3ubuntu10.31]
curl/focal-updates,focal-security 7.68.0-1ubuntu2.22 amd64 [upgradable from: 7.68.0-1ubuntu2.21]";

        let records = AptParser.parse(output);

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            UpdateRecord::new("systemd", "237-3ubuntu10.33", "bionic-updates")
        );
        assert_eq!(records[1].package_name, "curl");
        assert_eq!(records[1].package_repo, "focal-updates,focal-security");
    }

    #[test]
    fn test_epoch_version_is_kept_verbatim() {
        let output = "vim/now 2:8.2.2434-3+deb11u1 amd64 [upgradable from: 2:8.2.2434-3]";
        let records = AptParser.parse(output);

        assert_eq!(records[0].package_version, "2:8.2.2434-3+deb11u1");
        assert_eq!(records[0].package_repo, "now");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let output = "N: There is 1 additional version. Please use the '-a' switch to see it
openssl/jammy-security 3.0.2-0ubuntu1.15 amd64 [upgradable from: 3.0.2-0ubuntu1.14]
/jammy 1.0 amd64";

        let records = AptParser.parse(output);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].package_name, "openssl");
    }

    #[test]
    fn test_line_without_flags() {
        let records = AptParser.parse("libc6/stable 2.31-13+deb11u8 amd64");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_empty_output() {
        assert!(AptParser.parse("").is_empty());
        assert!(AptParser.parse("Listing... Done\n").is_empty());
    }
}
