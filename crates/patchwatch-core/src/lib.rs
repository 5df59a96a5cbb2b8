//! patchwatch-core: Fleet update audit pipeline
//!
//! Collects pending-update listings from every configured host, merges them
//! into a deduplicated [`Report`], and leaves delivery to the caller.

pub mod audit;
pub mod collector;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod host;
pub mod report;

pub use audit::run_audit;
pub use collector::{Collector, ExecutorFactory, SshExecutorFactory};
pub use config::{AuditConfig, CollectSettings, FamilyCommands, HostEntry, SshSettings};
pub use dedupe::{DedupedEntry, HostGroup, UpdateItem, dedupe_by_host, dedupe_by_host_set, failures};
pub use error::CoreError;
pub use host::{Host, HostError, HostFailure, HostOutcome, HostResult};
pub use report::Report;

pub use patchwatch_exec::ErrorKind;
pub use patchwatch_pkg::{PackageFamily, UpdateRecord};
