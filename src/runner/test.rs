//! Test phase wrapper.
//!
//! Synthesizes the verification command, prepares it for the run's sandbox
//! with the patch/commit context derived by the orchestrator, and classifies
//! the outcome strictly by exit code. Like the agent phase it never raises.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::config::{BenchPaths, DatasetKind, RunConfig};
use crate::exec::{strategy_for, Command, PrepareContext};
use crate::executor::{CommandExecutor, ExecError};
use crate::logs::sanitize_command;

use super::result::PhaseResult;

/// Patch/commit context for the verification run, derived by the
/// orchestrator from what the agent phase produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestContext {
    pub commit_id: Option<String>,
    pub apply_patch: Option<PathBuf>,
}

pub struct TestPhaseRunner {
    executor: Arc<dyn CommandExecutor>,
    paths: BenchPaths,
    container_name: String,
}

impl TestPhaseRunner {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        paths: BenchPaths,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            paths,
            container_name: container_name.into(),
        }
    }

    pub async fn run(
        &self,
        config: &RunConfig,
        task: &str,
        workspace: &Path,
        context: &TestContext,
    ) -> PhaseResult {
        let start = Instant::now();

        let core = Command::new(vec![
            "bash".to_string(),
            "-c".to_string(),
            config.test_command.clone(),
        ]);

        let mut ctx = PrepareContext::new(workspace, config.dataset);
        ctx.commit_id = context.commit_id.clone();
        ctx.apply_patch = context.apply_patch.clone();
        if config.dataset == DatasetKind::V2 {
            ctx.issue_id = Some(task.to_string());
        }

        let strategy = strategy_for(config.sandbox, &self.container_name, &self.paths);
        let prepared = strategy.prepare(&core, &ctx);

        if config.verbose {
            info!(task, "test command: {}", sanitize_command(&prepared.command));
        }

        let options = prepared.options.clone().with_timeout(config.timeout);
        let outcome = self.executor.execute(&prepared.command, &options).await;
        let duration = start.elapsed();

        match outcome {
            Ok(output) if output.is_success() => {
                info!(task, ?duration, "test phase succeeded");
                PhaseResult::success(duration, output.stdout)
            }
            Ok(output) => {
                error!(task, code = output.exit_code, "test phase failed");
                PhaseResult::failure(
                    duration,
                    format!("STDOUT: {}\nSTDERR: {}", output.stdout, output.stderr),
                    output.stdout,
                )
            }
            Err(ExecError::Timeout(limit)) => {
                error!(task, ?limit, "test phase timed out");
                PhaseResult::failure(duration, format!("Timed out after {limit:?}"), "")
            }
            Err(e) => {
                error!(task, error = %e, "test phase error");
                PhaseResult::failure(duration, e.to_string(), "")
            }
        }
    }
}
