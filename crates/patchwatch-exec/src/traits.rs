//! Remote executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Something that can run a shell command on one host
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command and collect its output
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError>;

    /// Run a command, failing with `ExecError::Timeout` if the whole call
    /// (including connection setup) exceeds `timeout`
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Release any session held by the executor
    async fn close(&self) -> Result<(), ExecError> {
        Ok(())
    }

    /// Whether a session is currently open
    fn is_connected(&self) -> bool {
        false
    }

    /// Short name used in logs
    fn executor_type(&self) -> &'static str;
}
