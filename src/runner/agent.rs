//! Agent phase wrapper.
//!
//! Builds the agent command, prepares it for the run's sandbox, executes it,
//! and turns the outcome into a [`PhaseResult`]. Never raises past its
//! boundary: configuration, I/O and execution errors all become
//! failure-shaped results so the orchestrator can proceed to verification.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::fs;
use tracing::{error, info};

use crate::agents::{create_builder, BuilderOptions};
use crate::config::{agent_script_path, BenchPaths, DatasetKind, RunConfig, SandboxKind, PATCHES_MOUNT};
use crate::dataset::{DatasetReader, TaskMetadata};
use crate::exec::{strategy_for, PrepareContext};
use crate::executor::{CommandExecutor, ExecError};
use crate::logs::{collector_for, sanitize_command};

use super::progress::ProgressMonitor;
use super::result::PhaseResult;

pub struct AgentPhaseRunner {
    executor: Arc<dyn CommandExecutor>,
    dataset: Arc<dyn DatasetReader>,
    paths: BenchPaths,
    container_name: String,
    base_instruction: String,
    custom_instruction: Option<String>,
}

impl AgentPhaseRunner {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        dataset: Arc<dyn DatasetReader>,
        paths: BenchPaths,
        container_name: impl Into<String>,
        base_instruction: impl Into<String>,
        custom_instruction: Option<String>,
    ) -> Self {
        Self {
            executor,
            dataset,
            paths,
            container_name: container_name.into(),
            base_instruction: base_instruction.into(),
            custom_instruction,
        }
    }

    pub async fn run(
        &self,
        config: &RunConfig,
        task: &str,
        workspace: &Path,
        metadata: &TaskMetadata,
    ) -> PhaseResult {
        let start = Instant::now();

        let monitor = config.show_progress.then(|| {
            ProgressMonitor::start(
                workspace.to_path_buf(),
                task.to_string(),
                Duration::from_secs(8),
            )
        });

        let result = self.run_inner(config, task, workspace, metadata, start).await;

        if let Some(monitor) = monitor {
            monitor.stop();
        }

        match result {
            Ok(phase) => phase,
            Err(message) => {
                error!(task, error = %message, "agent phase error");
                PhaseResult::failure(start.elapsed(), message, "")
            }
        }
    }

    async fn run_inner(
        &self,
        config: &RunConfig,
        task: &str,
        workspace: &Path,
        metadata: &TaskMetadata,
        start: Instant,
    ) -> Result<PhaseResult, String> {
        let instructions = self
            .dataset
            .instructions(
                task,
                &self.base_instruction,
                self.custom_instruction.as_deref(),
            )
            .await
            .map_err(|e| e.to_string())?;
        let file_list = self
            .dataset
            .task_files(task)
            .await
            .map_err(|e| e.to_string())?;

        let builder = create_builder(
            config.agent,
            BuilderOptions {
                model: config.model.clone(),
                provider: config.provider.clone(),
                script_path: agent_script_path(config.sandbox, config.dataset, &self.paths.host_root),
            },
        );
        let core = builder
            .build_command(&instructions, Some(&file_list))
            .map_err(|e| e.to_string())?;

        let generate_patch = match config.dataset {
            DatasetKind::V2 => {
                fs::create_dir_all(&self.paths.patches_dir)
                    .await
                    .map_err(|e| format!("could not create patches directory: {e}"))?;
                Some(match config.sandbox {
                    SandboxKind::Docker => {
                        Path::new(PATCHES_MOUNT).join(format!("{task}.patch"))
                    }
                    SandboxKind::Local => self.paths.patches_dir.join(format!("{task}.patch")),
                })
            }
            DatasetKind::V1 => None,
        };

        let mut ctx = PrepareContext::new(workspace, config.dataset);
        ctx.test_files = file_list.test_files.clone();
        ctx.commit_id = metadata.commit_id.clone();
        ctx.generate_patch = generate_patch;
        if config.dataset == DatasetKind::V2 {
            ctx.issue_id = Some(task.to_string());
        }

        let strategy = strategy_for(config.sandbox, &self.container_name, &self.paths);
        let prepared = strategy.prepare(&core, &ctx);

        if config.verbose {
            info!(task, "agent command: {}", sanitize_command(&prepared.command));
        }

        let options = prepared.options.clone().with_timeout(config.timeout);
        let outcome = self.executor.execute(&prepared.command, &options).await;
        let duration = start.elapsed();

        let result = match outcome {
            Ok(output) => {
                // Log collection runs regardless of the agent's exit status.
                collector_for(config.agent, &self.paths)
                    .collect(config, task, workspace, &output)
                    .await;

                if output.is_success() {
                    info!(task, ?duration, "agent phase succeeded");
                    PhaseResult::success(duration, output.stdout)
                } else {
                    error!(task, code = output.exit_code, "agent phase failed");
                    PhaseResult::failure(duration, output.stderr, output.stdout)
                }
            }
            Err(ExecError::Timeout(limit)) => {
                error!(task, ?limit, "agent phase timed out");
                PhaseResult::failure(duration, format!("Timed out after {limit:?}"), "")
            }
            Err(e) => {
                error!(task, error = %e, "agent phase error");
                PhaseResult::failure(duration, e.to_string(), "")
            }
        };

        Ok(result)
    }
}
