//! Subprocess execution boundary.
//!
//! [`CommandExecutor`] is the single point where a real OS process is
//! spawned. Everything above it works with argument vectors and
//! [`ExecOptions`], which keeps phase logic testable with a mock executor.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Process options for one invocation. The working directory is always
/// explicit; implementations must never change the orchestrator's own cwd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Captured outcome of one subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors from the execution boundary.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawns a host process for an argument vector and returns its captured
/// outcome.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, argv: &[String], opts: &ExecOptions)
        -> Result<CommandOutput, ExecError>;
}

/// Real executor backed by `tokio::process`.
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(
        &self,
        argv: &[String],
        opts: &ExecOptions,
    ) -> Result<CommandOutput, ExecError> {
        let (program, args) = argv.split_first().ok_or(ExecError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &opts.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &opts.env {
            cmd.env(key, value);
        }

        debug!(program, args = ?args, cwd = ?opts.cwd, "spawning process");

        let child = cmd.spawn().map_err(|e| ExecError::Spawn {
            program: program.clone(),
            source: e,
        })?;

        let output = match opts.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                // kill_on_drop reaps the child when the future is dropped here
                .map_err(|_| ExecError::Timeout(limit))??,
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_exit_code_captured() {
        let out = ProcessExecutor
            .execute(&argv(&["sh", "-c", "exit 7"]), &ExecOptions::default())
            .await
            .unwrap();
        assert_eq!(out.exit_code, 7);
        assert!(!out.is_success());
    }

    #[tokio::test]
    async fn test_stdout_and_stderr_captured() {
        let out = ProcessExecutor
            .execute(
                &argv(&["sh", "-c", "echo hello; echo oops >&2"]),
                &ExecOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(out.is_success());
    }

    #[tokio::test]
    async fn test_explicit_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ExecOptions {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let out = ProcessExecutor.execute(&argv(&["pwd"]), &opts).await.unwrap();
        let reported = std::fs::canonicalize(out.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_env_overlay() {
        let opts = ExecOptions {
            env: [("AGENTBENCH_TEST_VAR".to_string(), "42".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let out = ProcessExecutor
            .execute(&argv(&["sh", "-c", "echo $AGENTBENCH_TEST_VAR"]), &opts)
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "42");
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let opts = ExecOptions::default().with_timeout(Duration::from_millis(100));
        let err = ProcessExecutor
            .execute(&argv(&["sleep", "10"]), &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let err = ProcessExecutor
            .execute(&[], &ExecOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::EmptyCommand));
    }
}
