//! Configuration loading
//!
//! Settings come from an optional TOML or YAML file, overridden by
//! environment variables. The result is resolved once into an immutable
//! [`Settings`] before the audit starts.
//!
//! File discovery order:
//! - `--config <path>`
//! - `PATCHWATCH_CONFIG`
//! - `./patchwatch.toml`, `./patchwatch.yaml`
//! - `/etc/patchwatch/patchwatch.toml`
//! - `<config_dir>/patchwatch/patchwatch.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use patchwatch_core::{
    AuditConfig, CollectSettings, FamilyCommands, HostEntry, PackageFamily, SshSettings,
};
use patchwatch_exec::KeySource;
use patchwatch_mail::{Envelope, SmtpSecurity, SmtpSettings};

/// Configuration errors, reported with exit code 2
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("missing setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {setting}: {message}")]
    Invalid {
        setting: &'static str,
        message: String,
    },
}

/// Raw configuration file
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub email: EmailSection,
    #[serde(default)]
    pub smtp: SmtpSection,
    #[serde(default)]
    pub ssh: SshSection,
    #[serde(default)]
    pub apt_servers: Vec<HostEntry>,
    #[serde(default)]
    pub yum_servers: Vec<HostEntry>,
    #[serde(default)]
    pub commands: FamilyCommands,
    #[serde(default)]
    pub collect: CollectSection,
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct EmailSection {
    pub from_address: Option<String>,
    pub to_address: Option<Recipients>,
    pub subject: Option<String>,
}

/// `to_address` accepts a single address or a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    fn into_vec(self) -> Vec<String> {
        let list = match self {
            Recipients::One(address) => vec![address],
            Recipients::Many(list) => list,
        };
        list.into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

/// Split a comma separated address list, keeping quoted display names whole
fn split_addresses(list: &str) -> Vec<String> {
    let mut addresses = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in list.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => addresses.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    addresses.push(current);

    addresses
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SmtpSection {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: Option<SmtpSecurity>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SshSection {
    pub username: Option<String>,
    pub key_path: Option<PathBuf>,
    /// Environment variable holding a base64-encoded key
    pub key_env: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectSection {
    #[serde(default = "default_host_timeout")]
    pub host_timeout_secs: u64,
    /// 0 disables the whole-run deadline
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_host_timeout() -> u64 {
    60
}

fn default_run_timeout() -> u64 {
    600
}

fn default_max_concurrency() -> usize {
    16
}

impl Default for CollectSection {
    fn default() -> Self {
        Self {
            host_timeout_secs: default_host_timeout(),
            run_timeout_secs: default_run_timeout(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Hosts, commands, SSH login and collection limits
    pub audit: AuditConfig,
    /// Where the SSH private key is read from
    pub key: KeySource,
    /// Sender, recipients and subject
    pub envelope: Envelope,
    /// SMTP relay, `None` when mail is disabled
    pub smtp: Option<SmtpSettings>,
    pub log_level: Option<String>,
    /// File the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl FileConfig {
    /// Load a config file, picking the format from its extension
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            _ => toml::from_str(&content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Apply environment overrides; the environment wins over the file
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for values that do not parse
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(from) = env("EMAIL_FROM") {
            self.email.from_address = Some(from);
        }
        if let Some(to) = env("EMAIL_TO") {
            self.email.to_address = Some(Recipients::Many(split_addresses(&to)));
        }

        if let Some(server) = env("SMTP_SERVER") {
            self.smtp.server = Some(server);
        }
        if let Some(port) = env("SMTP_PORT") {
            self.smtp.port = Some(parse_number("SMTP_PORT", &port)?);
        }
        if let Some(user) = env("SMTP_USER") {
            self.smtp.username = Some(user);
        }
        if let Some(pass) = env("SMTP_PASS") {
            self.smtp.password = Some(pass);
        }

        if let Some(user) = env("SSH_USER") {
            self.ssh.username = Some(user);
        }
        if let Some(path) = env("SSH_KEY_PATH") {
            self.ssh.key_path = Some(PathBuf::from(path));
        }
        if let Some(var) = env("SSH_KEY_ENV") {
            self.ssh.key_env = Some(var);
        }

        if let Some(list) = env("APT_SERVERS") {
            self.apt_servers = parse_server_list("APT_SERVERS", &list)?;
        }
        if let Some(list) = env("YUM_SERVERS") {
            self.yum_servers = parse_server_list("YUM_SERVERS", &list)?;
        }

        if let Some(n) = env("PATCHWATCH_MAX_CONCURRENCY") {
            self.collect.max_concurrency = parse_number("PATCHWATCH_MAX_CONCURRENCY", &n)?;
        }
        if let Some(secs) = env("PATCHWATCH_HOST_TIMEOUT") {
            self.collect.host_timeout_secs = parse_number("PATCHWATCH_HOST_TIMEOUT", &secs)?;
        }
        if let Some(secs) = env("PATCHWATCH_RUN_TIMEOUT") {
            self.collect.run_timeout_secs = parse_number("PATCHWATCH_RUN_TIMEOUT", &secs)?;
        }

        Ok(())
    }

    /// Validate and resolve into run settings
    ///
    /// SMTP settings are only required when `mail_enabled` is set.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` naming the first absent setting
    pub fn resolve(self, mail_enabled: bool) -> Result<Settings, ConfigError> {
        let ssh_username = non_empty(self.ssh.username).ok_or(ConfigError::Missing("ssh.username"))?;
        let key = match (self.ssh.key_path, non_empty(self.ssh.key_env)) {
            (Some(path), _) => KeySource::Path(expand_home(&path)),
            (None, Some(var)) => KeySource::Env(var),
            (None, None) => return Err(ConfigError::Missing("ssh.key_path")),
        };

        if self.collect.host_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                setting: "collect.host_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        let from = non_empty(self.email.from_address);
        let to = self.email.to_address.map(Recipients::into_vec).unwrap_or_default();

        let smtp = if mail_enabled {
            if from.is_none() {
                return Err(ConfigError::Missing("email.from_address"));
            }
            if to.is_empty() {
                return Err(ConfigError::Missing("email.to_address"));
            }
            let server = non_empty(self.smtp.server).ok_or(ConfigError::Missing("smtp.server"))?;
            let username =
                non_empty(self.smtp.username).ok_or(ConfigError::Missing("smtp.username"))?;
            let password = self
                .smtp
                .password
                .ok_or(ConfigError::Missing("smtp.password"))?;

            let mut settings = SmtpSettings::new(server, username, password);
            if let Some(port) = self.smtp.port {
                settings.port = port;
            }
            if let Some(security) = self.smtp.security {
                settings.security = security;
            }
            Some(settings)
        } else {
            None
        };

        let mut envelope = Envelope::new(from.unwrap_or_else(|| "patchwatch@localhost".to_string()), to);
        if let Some(subject) = non_empty(self.email.subject) {
            envelope = envelope.with_subject(subject);
        }

        let mut ssh = SshSettings::new(ssh_username);
        if let Some(port) = self.ssh.port {
            ssh.port = port;
        }

        let collect = CollectSettings {
            host_timeout: Duration::from_secs(self.collect.host_timeout_secs),
            run_timeout: match self.collect.run_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            max_concurrency: self.collect.max_concurrency,
        };

        let mut audit = AuditConfig::new(ssh)
            .with_hosts(PackageFamily::Apt, self.apt_servers)
            .with_hosts(PackageFamily::Yum, self.yum_servers)
            .with_collect(collect);
        audit.commands = self.commands;

        Ok(Settings {
            audit,
            key,
            envelope,
            smtp,
            log_level: self.log_level,
            source: None,
        })
    }
}

/// Find the config file to use, if any
pub fn discover<F>(explicit: Option<&Path>, env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env("PATCHWATCH_CONFIG") {
        return Some(PathBuf::from(path));
    }

    default_paths().into_iter().find(|p| p.exists())
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("patchwatch.toml"),
        PathBuf::from("patchwatch.yaml"),
        PathBuf::from("/etc/patchwatch/patchwatch.toml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("patchwatch/patchwatch.toml"));
    }
    paths
}

/// Discover, load, override and resolve in one step
///
/// # Errors
/// Returns `ConfigError` for unreadable files, bad values or missing settings
pub fn load<F>(explicit: Option<&Path>, mail_enabled: bool, env: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let source = discover(explicit, &env);
    let mut file = match &source {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    file.apply_env(&env)?;

    let mut settings = file.resolve(mail_enabled)?;
    settings.source = source;
    Ok(settings)
}

fn parse_server_list(setting: &'static str, raw: &str) -> Result<Vec<HostEntry>, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
        setting,
        message: format!("expected a JSON list of hostnames: {e}"),
    })
}

fn parse_number<T>(setting: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        setting,
        message: e.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
