//! YUM/DNF output parsing (RHEL/CentOS/Amazon Linux)

use tracing::debug;

use crate::traits::PackageParser;
use crate::types::{PackageFamily, UpdateRecord};

/// Status lines yum and dnf print around the package list
const NOISE_PREFIXES: &[&str] = &[
    "Loaded plugins:",
    "Loading mirror speeds",
    " * ",
    "Determining fastest mirrors",
    "Last metadata expiration check",
    "Security:",
];

const OBSOLETING_HEADER: &str = "Obsoleting Packages";

/// Parser for `yum check-update`
///
/// Package names keep their `.arch` suffix so `foo.x86_64` and `foo.i686`
/// stay separate updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct YumParser;

impl YumParser {
    /// Parse `name.arch version repo`
    fn parse_line(line: &str) -> Option<UpdateRecord> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [name, version, repo] => Some(UpdateRecord::new(*name, *version, *repo)),
            _ => None,
        }
    }
}

impl PackageParser for YumParser {
    fn family(&self) -> PackageFamily {
        PackageFamily::Yum
    }

    fn parse(&self, output: &str) -> Vec<UpdateRecord> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut in_obsoletes = false;

        for line in output.lines() {
            if line.trim().is_empty() || NOISE_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            }

            if line.starts_with(OBSOLETING_HEADER) {
                in_obsoletes = true;
                continue;
            }

            // indented lines under "Obsoleting Packages" name the installed
            // package being replaced, not an update
            if in_obsoletes && line.starts_with(char::is_whitespace) {
                continue;
            }

            match Self::parse_line(line) {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    debug!(line = %line, "skipping unrecognized yum line");
                }
            }
        }

        debug!(count = records.len(), skipped, "parsed yum output");
        records
    }
}
