//! Type definitions for package update listings

use serde::{Deserialize, Serialize};

use crate::apt::AptParser;
use crate::traits::PackageParser;
use crate::yum::YumParser;

/// A pending update reported by one host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Package name as the package manager prints it (YUM keeps `.arch`)
    pub package_name: String,
    /// Version that would be installed
    pub package_version: String,
    /// Repository or channel offering the version
    pub package_repo: String,
}

impl UpdateRecord {
    /// Create a new update record
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            package_name: name.into(),
            package_version: version.into(),
            package_repo: repo.into(),
        }
    }
}

/// Package manager family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageFamily {
    /// APT (Debian/Ubuntu)
    Apt,
    /// YUM/DNF (RHEL/CentOS/Amazon Linux)
    Yum,
}

static APT_PARSER: AptParser = AptParser;
static YUM_PARSER: YumParser = YumParser;

impl PackageFamily {
    /// Every supported family
    pub const ALL: [PackageFamily; 2] = [PackageFamily::Apt, PackageFamily::Yum];

    /// Command listing pending updates, used when the configuration gives none
    #[must_use]
    pub fn default_command(self) -> &'static str {
        match self {
            PackageFamily::Apt => "apt list --upgradable",
            PackageFamily::Yum => "yum check-update",
        }
    }

    /// Whether an exit status means the listing succeeded
    ///
    /// `yum check-update` exits 100 when updates are pending and 0 when
    /// there are none; anything else is an error.
    #[must_use]
    pub fn accepts_exit_status(self, status: i32) -> bool {
        match self {
            PackageFamily::Apt => status == 0,
            PackageFamily::Yum => status == 0 || status == 100,
        }
    }

    /// Parser for this family's output
    #[must_use]
    pub fn parser(self) -> &'static dyn PackageParser {
        match self {
            PackageFamily::Apt => &APT_PARSER,
            PackageFamily::Yum => &YUM_PARSER,
        }
    }

    /// Parse raw command output for this family
    #[must_use]
    pub fn parse(self, output: &str) -> Vec<UpdateRecord> {
        self.parser().parse(output)
    }
}

impl std::fmt::Display for PackageFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageFamily::Apt => write!(f, "apt"),
            PackageFamily::Yum => write!(f, "yum"),
        }
    }
}
