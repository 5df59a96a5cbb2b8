//! Configuration types for an audit run
//!
//! These are plain values; reading files and the environment happens in the
//! binary before a run starts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use patchwatch_pkg::PackageFamily;

use crate::host::Host;

/// Everything the pipeline needs for one run
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Hosts to audit, across both families
    pub hosts: Vec<Host>,
    /// Command run per family
    pub commands: FamilyCommands,
    /// SSH login settings
    pub ssh: SshSettings,
    /// Concurrency and timeouts
    pub collect: CollectSettings,
}

impl AuditConfig {
    /// Create a config with no hosts and default commands
    pub fn new(ssh: SshSettings) -> Self {
        Self {
            hosts: Vec::new(),
            commands: FamilyCommands::default(),
            ssh,
            collect: CollectSettings::default(),
        }
    }

    /// Add hosts of one family
    #[must_use]
    pub fn with_hosts<I, E>(mut self, family: PackageFamily, entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<HostEntry>,
    {
        self.hosts
            .extend(entries.into_iter().map(|e| e.into().into_host(family)));
        self
    }

    /// Replace the collection settings
    #[must_use]
    pub fn with_collect(mut self, collect: CollectSettings) -> Self {
        self.collect = collect;
        self
    }

    /// Number of hosts of one family
    #[must_use]
    pub fn host_count(&self, family: PackageFamily) -> usize {
        self.hosts.iter().filter(|h| h.family == family).count()
    }
}

/// A configured server: a bare hostname, or a hostname with its SSH address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostEntry {
    Name(String),
    Addressed { name: String, addr: String },
}

impl HostEntry {
    /// Host of the given family for this entry
    #[must_use]
    pub fn into_host(self, family: PackageFamily) -> Host {
        match self {
            HostEntry::Name(name) => Host::new(name, family),
            HostEntry::Addressed { name, addr } => Host::new(name, family).with_addr(addr),
        }
    }
}

impl From<String> for HostEntry {
    fn from(name: String) -> Self {
        HostEntry::Name(name)
    }
}

impl From<&str> for HostEntry {
    fn from(name: &str) -> Self {
        HostEntry::Name(name.to_string())
    }
}

/// Per-family "list pending updates" command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCommands {
    /// Command for APT hosts
    #[serde(default = "default_apt_command")]
    pub apt: String,
    /// Command for YUM hosts
    #[serde(default = "default_yum_command")]
    pub yum: String,
}

fn default_apt_command() -> String {
    PackageFamily::Apt.default_command().to_string()
}

fn default_yum_command() -> String {
    PackageFamily::Yum.default_command().to_string()
}

impl Default for FamilyCommands {
    fn default() -> Self {
        Self {
            apt: default_apt_command(),
            yum: default_yum_command(),
        }
    }
}

impl FamilyCommands {
    /// Command for the given family
    #[must_use]
    pub fn for_family(&self, family: PackageFamily) -> &str {
        match family {
            PackageFamily::Apt => &self.apt,
            PackageFamily::Yum => &self.yum,
        }
    }
}

/// SSH login settings shared by every host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    /// Remote user
    pub username: String,
    /// Remote port
    pub port: u16,
}

impl SshSettings {
    /// Settings for a user on the default port
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            port: 22,
        }
    }
}

/// Concurrency and timeout settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSettings {
    /// Limit for a single host, connection included
    pub host_timeout: Duration,
    /// Limit for the whole collection phase
    pub run_timeout: Option<Duration>,
    /// Hosts queried at once
    pub max_concurrency: usize,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            host_timeout: Duration::from_secs(60),
            run_timeout: Some(Duration::from_secs(600)),
            max_concurrency: 16,
        }
    }
}
