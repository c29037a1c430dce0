//! Exercise state management (v1).
//!
//! Task directories live inside a git checkout, so a clean baseline is
//! whatever HEAD says. The resetter restores that baseline before the agent
//! runs and restores the original test files afterwards, so the agent cannot
//! tamper with verification even if it rewrote the whole workspace.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::executor::{CommandExecutor, ExecError, ExecOptions};

pub struct ExerciseResetter {
    executor: Arc<dyn CommandExecutor>,
}

impl ExerciseResetter {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<i32, ExecError> {
        let mut argv = vec!["git".to_string()];
        argv.extend(args.iter().map(|s| s.to_string()));
        let opts = ExecOptions {
            cwd: Some(dir.to_path_buf()),
            ..Default::default()
        };
        let out = self.executor.execute(&argv, &opts).await?;
        if !out.is_success() {
            debug!(dir = %dir.display(), ?args, stderr = %out.stderr, "git command failed");
        }
        Ok(out.exit_code)
    }

    /// Restores the task directory to its clean baseline: drop tracked
    /// modifications, then remove untracked residue from earlier iterations.
    pub async fn reset(&self, dir: &Path, verbose: bool) -> Result<(), ExecError> {
        if verbose {
            info!(dir = %dir.display(), "resetting exercise to clean baseline");
        }
        self.git(dir, &["checkout", "HEAD", "--", "."]).await?;
        self.git(dir, &["clean", "-fd", "."]).await?;
        Ok(())
    }

    /// Restores the original test files after the agent ran. Failures are
    /// logged and swallowed: a missing file just means the agent never
    /// touched it.
    pub async fn restore_test_files(&self, dir: &Path, test_files: &[String]) {
        for file in test_files {
            match self.git(dir, &["checkout", "HEAD", "--", file]).await {
                Ok(0) => {}
                Ok(code) => warn!(file, code, "could not restore test file"),
                Err(e) => warn!(file, error = %e, "could not restore test file"),
            }
        }
    }

    /// Logs the agent-produced diff (verbose runs only).
    pub async fn log_diff(&self, dir: &Path) {
        let opts = ExecOptions {
            cwd: Some(dir.to_path_buf()),
            ..Default::default()
        };
        match self
            .executor
            .execute(&["git".to_string(), "diff".to_string()], &opts)
            .await
        {
            Ok(out) if out.stdout.trim().is_empty() => {
                info!(dir = %dir.display(), "agent made no tracked changes");
            }
            Ok(out) => info!("agent diff:\n{}", out.stdout),
            Err(e) => warn!(error = %e, "could not compute agent diff"),
        }
    }
}
