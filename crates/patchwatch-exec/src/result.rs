//! Result types for command execution

use std::time::Duration;

/// Result of a command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit status code, -1 if the session closed without reporting one
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Short human-readable reason for a failed command
    ///
    /// Prefers stderr; falls back to the last non-empty stdout line, since
    /// some package managers print their errors on stdout.
    #[must_use]
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        self.stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("no output")
            .to_string()
    }
}

/// Connection information for SSH
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Host address
    pub host: String,
    /// Port (default 22)
    pub port: u16,
    /// Username
    pub user: String,
}

impl ConnectionInfo {
    /// Create new connection info on the default port
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: i32, stdout: &str, stderr: &str) -> CommandResult {
        CommandResult {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_failure_message_prefers_stderr() {
        let r = result(1, "stdout line", "  permission denied\n");
        assert_eq!(r.failure_message(), "permission denied");
    }

    #[test]
    fn test_failure_message_falls_back_to_stdout() {
        let r = result(1, "Loaded plugins: fastestmirror\nError: Cannot find a valid baseurl\n\n", "");
        assert_eq!(r.failure_message(), "Error: Cannot find a valid baseurl");
        assert_eq!(result(1, "", "").failure_message(), "no output");
    }

    #[test]
    fn test_connection_info_port() {
        let info = ConnectionInfo::new("web1", "audit").with_port(2222);
        assert_eq!(info.port, 2222);
        assert_eq!(ConnectionInfo::new("web1", "audit").port, 22);
    }
}
