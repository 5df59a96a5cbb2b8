//! Core error types for patchwatch-core

use thiserror::Error;

/// Errors that stop a run from producing a report
///
/// Per-host problems never show up here; they are recorded in the report's
/// failure list instead.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// No hosts were configured for any family
    #[error("no hosts configured")]
    NoHosts,

    /// Every host failed, so there is nothing to report
    #[error("no reachable hosts ({failed} failed)")]
    NoReachableHosts {
        /// Number of hosts that failed
        failed: usize,
    },

    /// Report could not be rendered
    #[error("failed to serialize report: {0}")]
    Serialization(String),
}
