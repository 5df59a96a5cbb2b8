//! Per-host collection
//!
//! Queries every host through a bounded pool of concurrent sessions and
//! returns one [`HostResult`] per host, sorted by hostname.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, instrument, warn};

use patchwatch_exec::{
    ConnectionInfo, Credential, ExecError, LocalExecutor, RemoteExecutor, SshExecutor,
};
use patchwatch_pkg::UpdateRecord;

use crate::config::{AuditConfig, CollectSettings, FamilyCommands, SshSettings};
use crate::host::{Host, HostError, HostResult};

/// Creates the executor used to query one host
///
/// Allows tests and alternative transports to replace SSH.
#[async_trait]
pub trait ExecutorFactory: Send + Sync {
    /// Create an executor for the given host
    async fn create_executor(&self, host: &Host) -> Result<Arc<dyn RemoteExecutor>, ExecError>;
}

/// Default factory: SSH for remote hosts, local shell for `localhost`
pub struct SshExecutorFactory {
    ssh: SshSettings,
    credential: Credential,
}

impl SshExecutorFactory {
    /// Create a factory sharing one credential across all hosts
    pub fn new(ssh: SshSettings, credential: Credential) -> Self {
        Self { ssh, credential }
    }
}

#[async_trait]
impl ExecutorFactory for SshExecutorFactory {
    async fn create_executor(&self, host: &Host) -> Result<Arc<dyn RemoteExecutor>, ExecError> {
        if LocalExecutor::is_local_addr(&host.addr) {
            return Ok(Arc::new(LocalExecutor::new()));
        }

        if self.ssh.username.is_empty() {
            return Err(ExecError::ConfigError("SSH username is empty".to_string()));
        }

        let conn_info = ConnectionInfo::new(&host.addr, &self.ssh.username).with_port(self.ssh.port);
        Ok(Arc::new(SshExecutor::new(conn_info, self.credential.clone())))
    }
}

/// Fans out over hosts and gathers their update listings
pub struct Collector {
    factory: Arc<dyn ExecutorFactory>,
    commands: FamilyCommands,
    settings: CollectSettings,
}

impl Collector {
    /// Create a collector
    pub fn new(
        factory: Arc<dyn ExecutorFactory>,
        commands: FamilyCommands,
        settings: CollectSettings,
    ) -> Self {
        Self {
            factory,
            commands,
            settings,
        }
    }

    /// Create a collector from an audit config
    pub fn from_config(factory: Arc<dyn ExecutorFactory>, config: &AuditConfig) -> Self {
        Self::new(factory, config.commands.clone(), config.collect.clone())
    }

    /// Query every host and return one result per distinct host
    ///
    /// Never fails as a whole: unreachable hosts, rejected logins, timeouts
    /// and failing commands are recorded in that host's result. Output is
    /// sorted by hostname whatever order the sessions finish in.
    #[instrument(skip(self, hosts), fields(hosts = hosts.len()))]
    pub async fn collect(&self, hosts: &[Host]) -> Vec<HostResult> {
        let mut hosts = hosts.to_vec();
        hosts.sort();
        hosts.dedup();

        let concurrency = self.settings.max_concurrency.max(1);
        let deadline = self.settings.run_timeout.map(|t| Instant::now() + t);

        info!(
            total_hosts = hosts.len(),
            concurrency,
            host_timeout = ?self.settings.host_timeout,
            run_timeout = ?self.settings.run_timeout,
            "collecting pending updates"
        );

        let mut results: Vec<HostResult> = stream::iter(hosts)
            .map(|host| self.collect_host(host, deadline))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        results.sort_by(|a, b| a.host.cmp(&b.host));

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            total = results.len(),
            succeeded = results.len() - failed,
            failed,
            "collection finished"
        );

        results
    }

    async fn collect_host(&self, host: Host, deadline: Option<Instant>) -> HostResult {
        let run_timeout = ExecError::Timeout {
            timeout: self.settings.run_timeout.unwrap_or(Duration::ZERO),
        };

        let outcome = match deadline {
            // no new sessions once the run deadline has passed
            Some(deadline) if Instant::now() >= deadline => Err(run_timeout),
            Some(deadline) => timeout_at(deadline, self.query_host(&host))
                .await
                .unwrap_or(Err(run_timeout)),
            None => self.query_host(&host).await,
        };

        match outcome {
            Ok(records) => {
                debug!(host = %host.hostname, count = records.len(), "collected updates");
                HostResult::updates(host, records)
            }
            Err(e) if e.is_timeout() => {
                error!(
                    host = %host.hostname,
                    family = %host.family,
                    error = %e,
                    "host timed out"
                );
                HostResult::failed(host, HostError::from(&e))
            }
            Err(e) => {
                warn!(
                    host = %host.hostname,
                    family = %host.family,
                    kind = %e.kind(),
                    error = %e,
                    "failed to collect updates"
                );
                HostResult::failed(host, HostError::from(&e))
            }
        }
    }

    #[instrument(skip(self, host), fields(host = %host.hostname, family = %host.family))]
    async fn query_host(&self, host: &Host) -> Result<Vec<UpdateRecord>, ExecError> {
        let executor = self.factory.create_executor(host).await?;
        let command = self.commands.for_family(host.family);

        let result = executor
            .run_with_timeout(command, self.settings.host_timeout)
            .await;

        if let Err(e) = executor.close().await {
            debug!(error = %e, "failed to close session");
        }

        let result = result?;

        if !host.family.accepts_exit_status(result.status) {
            return Err(ExecError::CommandFailed {
                status: result.status,
                stderr: result.failure_message(),
            });
        }

        Ok(host.family.parse(&result.stdout))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use patchwatch_exec::{CommandResult, ErrorKind};
    use patchwatch_pkg::PackageFamily;

    use super::*;
    use crate::host::HostOutcome;

    /// Scripted response for one host
    #[derive(Clone)]
    enum Script {
        Output { status: i32, stdout: &'static str, delay: Duration },
        Fail(ExecError),
    }

    struct MockExecutor {
        script: Script,
    }

    #[async_trait]
    impl RemoteExecutor for MockExecutor {
        async fn run(&self, _cmd: &str) -> Result<CommandResult, ExecError> {
            match &self.script {
                Script::Output {
                    status,
                    stdout,
                    delay,
                } => {
                    tokio::time::sleep(*delay).await;
                    Ok(CommandResult {
                        status: *status,
                        stdout: (*stdout).to_string(),
                        stderr: String::new(),
                        duration: *delay,
                    })
                }
                Script::Fail(e) => Err(e.clone()),
            }
        }

        async fn run_with_timeout(
            &self,
            cmd: &str,
            timeout: Duration,
        ) -> Result<CommandResult, ExecError> {
            match tokio::time::timeout(timeout, self.run(cmd)).await {
                Ok(r) => r,
                Err(_) => Err(ExecError::Timeout { timeout }),
            }
        }

        fn executor_type(&self) -> &'static str {
            "mock"
        }
    }

    #[derive(Default)]
    struct MockFactory {
        scripts: HashMap<String, Script>,
        created: AtomicUsize,
    }

    #[async_trait]
    impl ExecutorFactory for MockFactory {
        async fn create_executor(
            &self,
            host: &Host,
        ) -> Result<Arc<dyn RemoteExecutor>, ExecError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            let script = self
                .scripts
                .get(&host.hostname)
                .cloned()
                .ok_or_else(|| ExecError::ConnectionFailed("unknown host".to_string()))?;
            Ok(Arc::new(MockExecutor { script }))
        }
    }

    fn output(status: i32, stdout: &'static str, delay_ms: u64) -> Script {
        Script::Output {
            status,
            stdout,
            delay: Duration::from_millis(delay_ms),
        }
    }

    fn collector(scripts: Vec<(&str, Script)>, settings: CollectSettings) -> Collector {
        let factory = MockFactory {
            scripts: scripts
                .into_iter()
                .map(|(h, s)| (h.to_string(), s))
                .collect(),
            ..MockFactory::default()
        };
        Collector::new(Arc::new(factory), FamilyCommands::default(), settings)
    }

    fn yum_hosts(names: &[&str]) -> Vec<Host> {
        names
            .iter()
            .map(|n| Host::new(*n, PackageFamily::Yum))
            .collect()
    }

    #[tokio::test]
    async fn test_results_sorted_regardless_of_completion_order() {
        let line = "bash.x86_64 4.2.46-34.el7 base";
        let c = collector(
            vec![
                ("alpha", output(100, line, 60)),
                ("bravo", output(100, line, 1)),
                ("charlie", output(100, line, 30)),
            ],
            CollectSettings::default(),
        );

        let results = c.collect(&yum_hosts(&["charlie", "alpha", "bravo"])).await;

        let names: Vec<_> = results.iter().map(|r| r.host.hostname.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
        assert!(results.iter().all(HostResult::is_success));
    }

    #[tokio::test]
    async fn test_fault_isolation() {
        let c = collector(
            vec![
                ("a", output(100, "kernel.x86_64 3.10.0-1160 updates", 1)),
                (
                    "b",
                    Script::Fail(ExecError::AuthenticationFailed("denied".into())),
                ),
                ("c", output(0, "", 1)),
            ],
            CollectSettings::default(),
        );

        let results = c.collect(&yum_hosts(&["a", "b", "c"])).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].records().map(<[_]>::len), Some(1));
        match &results[1].outcome {
            HostOutcome::Failed(e) => assert_eq!(e.kind, ErrorKind::Connection),
            HostOutcome::Updates(_) => panic!("expected failure for b"),
        }
        assert_eq!(results[2].records().map(<[_]>::len), Some(0));
    }

    #[tokio::test]
    async fn test_unexpected_exit_status_is_execution_error() {
        let c = collector(
            vec![("a", output(1, "Error: Cannot find a valid baseurl", 1))],
            CollectSettings::default(),
        );

        let results = c.collect(&yum_hosts(&["a"])).await;

        match &results[0].outcome {
            HostOutcome::Failed(e) => {
                assert_eq!(e.kind, ErrorKind::Execution);
                assert!(e.message.contains("Cannot find a valid baseurl"));
            }
            HostOutcome::Updates(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_host_timeout() {
        let c = collector(
            vec![("slow", output(0, "", 5_000)), ("fast", output(0, "", 1))],
            CollectSettings {
                host_timeout: Duration::from_millis(50),
                run_timeout: None,
                max_concurrency: 4,
            },
        );

        let results = c.collect(&yum_hosts(&["slow", "fast"])).await;

        assert!(results[0].is_success());
        match &results[1].outcome {
            HostOutcome::Failed(e) => assert_eq!(e.kind, ErrorKind::Connection),
            HostOutcome::Updates(_) => panic!("expected timeout"),
        }
    }

    #[tokio::test]
    async fn test_run_deadline_keeps_finished_hosts() {
        let c = collector(
            vec![
                ("done", output(100, "bash.x86_64 4.2.46-34 base", 1)),
                ("stuck", output(0, "", 5_000)),
                ("queued", output(0, "", 5_000)),
            ],
            CollectSettings {
                host_timeout: Duration::from_secs(60),
                run_timeout: Some(Duration::from_millis(100)),
                max_concurrency: 2,
            },
        );

        let results = c.collect(&yum_hosts(&["done", "stuck", "queued"])).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        for r in &results[1..] {
            match &r.outcome {
                HostOutcome::Failed(e) => {
                    assert_eq!(e.kind, ErrorKind::Connection);
                    assert!(e.message.contains("timed out"));
                }
                HostOutcome::Updates(_) => panic!("expected deadline failure"),
            }
        }
    }

    #[tokio::test]
    async fn test_no_sessions_opened_after_deadline() {
        let factory = Arc::new(MockFactory {
            scripts: [
                ("first", output(0, "", 5_000)),
                ("second", output(0, "", 1)),
                ("third", output(0, "", 1)),
            ]
            .into_iter()
            .map(|(h, s)| (h.to_string(), s))
            .collect(),
            ..MockFactory::default()
        });
        let c = Collector::new(
            factory.clone(),
            FamilyCommands::default(),
            CollectSettings {
                host_timeout: Duration::from_secs(60),
                run_timeout: Some(Duration::from_millis(50)),
                max_concurrency: 1,
            },
        );

        let results = c.collect(&yum_hosts(&["first", "second", "third"])).await;

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| !r.is_success()));
    }

    #[tokio::test]
    async fn test_duplicate_hosts_collected_once() {
        let c = collector(vec![("a", output(0, "", 1))], CollectSettings::default());

        let results = c.collect(&yum_hosts(&["a", "a"])).await;

        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let c = collector(
            vec![("a", output(0, "", 1))],
            CollectSettings {
                max_concurrency: 0,
                ..CollectSettings::default()
            },
        );

        let results = c.collect(&yum_hosts(&["a"])).await;

        assert!(results[0].is_success());
    }

    #[tokio::test]
    async fn test_ssh_factory_uses_local_executor_for_localhost() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(include_str!("../../../testdata/id_ed25519"));
        let credential = Credential::from_base64(&encoded).unwrap();
        let factory = SshExecutorFactory::new(SshSettings::new("audit"), credential);
        let executor = factory
            .create_executor(&Host::new("localhost", PackageFamily::Apt))
            .await
            .unwrap();
        assert_eq!(executor.executor_type(), "local");

        let executor = factory
            .create_executor(&Host::new("web1", PackageFamily::Apt))
            .await
            .unwrap();
        assert_eq!(executor.executor_type(), "ssh");
    }
}
