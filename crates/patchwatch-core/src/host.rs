//! Hosts and per-host collection outcomes

use serde::{Deserialize, Serialize};

use patchwatch_exec::{ErrorKind, ExecError};
use patchwatch_pkg::{PackageFamily, UpdateRecord};

/// One audited machine
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Host {
    /// Name used in the report
    pub hostname: String,
    /// Package manager family
    pub family: PackageFamily,
    /// Address to connect to (defaults to the hostname)
    pub addr: String,
}

impl Host {
    /// Create a host reachable under its own name
    pub fn new(hostname: impl Into<String>, family: PackageFamily) -> Self {
        let hostname = hostname.into();
        Self {
            addr: hostname.clone(),
            hostname,
            family,
        }
    }

    /// Connect to a different address than the hostname
    #[must_use]
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }
}

/// Why collection from a host failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    /// Failure category
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl From<&ExecError> for HostError {
    fn from(err: &ExecError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Records or failure for one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    /// Listing succeeded (possibly with zero updates)
    Updates(Vec<UpdateRecord>),
    /// Listing failed
    Failed(HostError),
}

/// Outcome of one collection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResult {
    /// Host that was queried
    pub host: Host,
    /// Records or failure
    pub outcome: HostOutcome,
}

impl HostResult {
    /// Successful result
    #[must_use]
    pub fn updates(host: Host, records: Vec<UpdateRecord>) -> Self {
        Self {
            host,
            outcome: HostOutcome::Updates(records),
        }
    }

    /// Failed result
    #[must_use]
    pub fn failed(host: Host, error: HostError) -> Self {
        Self {
            host,
            outcome: HostOutcome::Failed(error),
        }
    }

    /// Whether collection succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, HostOutcome::Updates(_))
    }

    /// Records, if collection succeeded
    #[must_use]
    pub fn records(&self) -> Option<&[UpdateRecord]> {
        match &self.outcome {
            HostOutcome::Updates(records) => Some(records),
            HostOutcome::Failed(_) => None,
        }
    }
}

/// A failed host as it appears in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFailure {
    /// Name of the failed host
    pub hostname: String,
    /// Package manager family it was queried as
    pub family: PackageFamily,
    /// Failure category
    pub error: ErrorKind,
    /// Human-readable detail
    pub message: String,
}
