//! Package manager output parser trait

use crate::types::{PackageFamily, UpdateRecord};

/// Grammar for one package manager family's "pending updates" listing
///
/// Implementations never fail: lines they do not recognize are skipped.
pub trait PackageParser: Send + Sync {
    /// Family this parser understands
    fn family(&self) -> PackageFamily;

    /// Extract every update record the output contains
    fn parse(&self, output: &str) -> Vec<UpdateRecord>;
}
