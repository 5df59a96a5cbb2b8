//! Deduplication of update records across hosts
//!
//! First level: one [`DedupedEntry`] per distinct update, listing every host
//! that needs it. Second level: one [`HostGroup`] per distinct set of hosts,
//! listing every update that exact set needs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use patchwatch_pkg::UpdateRecord;

use crate::host::{HostFailure, HostOutcome, HostResult};

/// Deduplication key: a package at a version from a repository
///
/// Compared byte for byte; versions differing only in build metadata are
/// distinct items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UpdateItem {
    pub package_name: String,
    pub package_version: String,
    pub package_repo: String,
}

impl From<&UpdateRecord> for UpdateItem {
    fn from(record: &UpdateRecord) -> Self {
        Self {
            package_name: record.package_name.clone(),
            package_version: record.package_version.clone(),
            package_repo: record.package_repo.clone(),
        }
    }
}

impl From<&UpdateItem> for UpdateRecord {
    fn from(item: &UpdateItem) -> Self {
        UpdateRecord::new(
            item.package_name.clone(),
            item.package_version.clone(),
            item.package_repo.clone(),
        )
    }
}

/// One update and the hosts that need it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupedEntry {
    pub update_item: UpdateItem,
    pub hostnames: BTreeSet<String>,
    pub host_count: usize,
}

impl DedupedEntry {
    fn new(update_item: UpdateItem, hostnames: BTreeSet<String>) -> Self {
        Self {
            update_item,
            host_count: hostnames.len(),
            hostnames,
        }
    }
}

/// Updates needed by exactly the same set of hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroup {
    pub update_list: Vec<UpdateItem>,
    pub update_count: usize,
    pub hostnames: BTreeSet<String>,
    pub host_count: usize,
}

/// Group records from all successful hosts by update item
///
/// Entries are ordered by descending host count, then by package name,
/// version and repository.
#[must_use]
pub fn dedupe_by_host(results: &[HostResult]) -> Vec<DedupedEntry> {
    let mut by_item: HashMap<UpdateItem, BTreeSet<String>> = HashMap::new();

    for result in results {
        let HostOutcome::Updates(records) = &result.outcome else {
            continue;
        };
        for record in records {
            by_item
                .entry(UpdateItem::from(record))
                .or_default()
                .insert(result.host.hostname.clone());
        }
    }

    let mut entries: Vec<DedupedEntry> = by_item
        .into_iter()
        .map(|(item, hostnames)| DedupedEntry::new(item, hostnames))
        .collect();

    entries.sort_by(|a, b| {
        b.host_count
            .cmp(&a.host_count)
            .then_with(|| a.update_item.cmp(&b.update_item))
    });

    entries
}

/// Group first-level entries by identical host set
///
/// Groups are ordered by descending host count, then by hostname list;
/// updates inside a group keep the order of `entries`.
#[must_use]
pub fn dedupe_by_host_set(entries: &[DedupedEntry]) -> Vec<HostGroup> {
    let mut by_hosts: BTreeMap<&BTreeSet<String>, Vec<UpdateItem>> = BTreeMap::new();

    for entry in entries {
        by_hosts
            .entry(&entry.hostnames)
            .or_default()
            .push(entry.update_item.clone());
    }

    let mut groups: Vec<HostGroup> = by_hosts
        .into_iter()
        .map(|(hostnames, update_list)| HostGroup {
            update_count: update_list.len(),
            update_list,
            host_count: hostnames.len(),
            hostnames: hostnames.clone(),
        })
        .collect();

    // stable: ties keep the lexical order from the BTreeMap
    groups.sort_by(|a, b| b.host_count.cmp(&a.host_count));

    groups
}

/// Failed hosts, sorted by hostname then family
#[must_use]
pub fn failures(results: &[HostResult]) -> Vec<HostFailure> {
    let mut failures: Vec<HostFailure> = results
        .iter()
        .filter_map(|r| match &r.outcome {
            HostOutcome::Failed(e) => Some(HostFailure {
                hostname: r.host.hostname.clone(),
                family: r.host.family,
                error: e.kind,
                message: e.message.clone(),
            }),
            HostOutcome::Updates(_) => None,
        })
        .collect();

    failures.sort_by(|a, b| a.hostname.cmp(&b.hostname).then(a.family.cmp(&b.family)));
    failures.dedup_by(|a, b| a.hostname == b.hostname && a.family == b.family);

    failures
}
