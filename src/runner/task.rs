//! Per-task orchestration.
//!
//! Owns the phase sequence and the dataset/sandbox decision matrix:
//!
//! ```text
//! Init → [v2 ∧ local: CheckoutCommit → ApplyBugPatchIfPresent]
//!      → [v1: ResetWorkspace]
//!      → AgentPhase
//!      → [v1: RestoreTestFiles → (verbose: LogDiff)]
//!      → DerivePatchContext → TestPhase → Aggregate
//! ```
//!
//! The agent phase failing never skips the test phase; verification always
//! records the actual on-disk state. Only an unrecoverable setup error for
//! the current task is caught and converted into a failure result so the
//! batch loop can continue with other tasks.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::{BenchPaths, DatasetKind, RunConfig, SandboxKind, PATCHES_MOUNT};
use crate::dataset::{DatasetReader, TaskMetadata};
use crate::executor::{CommandExecutor, ExecOptions};
use crate::workspace::ExerciseResetter;

use super::agent::AgentPhaseRunner;
use super::result::{PhaseResult, TaskResult};
use super::test::{TestContext, TestPhaseRunner};

pub struct TaskRunner {
    executor: Arc<dyn CommandExecutor>,
    dataset: Arc<dyn DatasetReader>,
    agent_runner: AgentPhaseRunner,
    test_runner: TestPhaseRunner,
    resetter: ExerciseResetter,
    paths: BenchPaths,
}

impl TaskRunner {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        dataset: Arc<dyn DatasetReader>,
        agent_runner: AgentPhaseRunner,
        test_runner: TestPhaseRunner,
        paths: BenchPaths,
    ) -> Self {
        let resetter = ExerciseResetter::new(executor.clone());
        Self {
            executor,
            dataset,
            agent_runner,
            test_runner,
            resetter,
            paths,
        }
    }

    pub async fn run(&self, config: &RunConfig, task: &str) -> TaskResult {
        let start = Instant::now();
        info!(task, dataset = %config.dataset, sandbox = %config.sandbox, "starting task");

        let result = match self.run_inner(config, task, start).await {
            Ok(result) => result,
            Err(message) => {
                warn!(task, error = %message, "task setup failed");
                TaskResult::new(
                    task,
                    PhaseResult::failure(start.elapsed(), message, ""),
                    PhaseResult::failure(Duration::ZERO, "skipped: task setup failed", ""),
                    start.elapsed(),
                )
            }
        };

        info!(
            task,
            success = result.overall_success,
            duration = ?result.total_duration,
            "task finished"
        );
        result
    }

    async fn run_inner(
        &self,
        config: &RunConfig,
        task: &str,
        start: Instant,
    ) -> Result<TaskResult, String> {
        let workspace = self.paths.workspace_for(config.dataset, task);

        // Metadata is resolved once and reused by both phases.
        let metadata = self
            .dataset
            .metadata(task)
            .await
            .map_err(|e| e.to_string())?;

        if config.dataset == DatasetKind::V2 && config.sandbox == SandboxKind::Local {
            self.checkout_and_reintroduce_bug(task, &workspace, &metadata)
                .await?;
        }

        if config.dataset == DatasetKind::V1 {
            self.resetter
                .reset(&workspace, config.verbose)
                .await
                .map_err(|e| format!("workspace reset failed: {e}"))?;
        }

        let agent = self
            .agent_runner
            .run(config, task, &workspace, &metadata)
            .await;

        if config.dataset == DatasetKind::V1 {
            match self.dataset.test_files(task).await {
                Ok(test_files) => {
                    self.resetter
                        .restore_test_files(&workspace, &test_files)
                        .await
                }
                Err(e) => warn!(task, error = %e, "could not list test files for restore"),
            }
            if config.verbose {
                self.resetter.log_diff(&workspace).await;
            }
        }

        let context = Self::derive_test_context(config, task, &metadata);
        let test = self
            .test_runner
            .run(config, task, &workspace, &context)
            .await;

        Ok(TaskResult::new(task, agent, test, start.elapsed()))
    }

    /// Decides what state handling the test phase needs.
    ///
    /// v2 in Docker: the container is fresh, so verification must replay the
    /// patch the agent phase generated. v2 locally: the agent mutated the
    /// checkout in place; applying a patch or re-resetting the commit would
    /// destroy exactly the changes under test, so neither happens.
    fn derive_test_context(config: &RunConfig, task: &str, metadata: &TaskMetadata) -> TestContext {
        match (config.dataset, config.sandbox) {
            (DatasetKind::V2, SandboxKind::Docker) => TestContext {
                commit_id: metadata.commit_id.clone(),
                apply_patch: Some(Path::new(PATCHES_MOUNT).join(format!("{task}.patch"))),
            },
            _ => TestContext::default(),
        }
    }

    /// v2 local setup: hard-reset the shared checkout to the task's commit,
    /// sync submodules, then reintroduce the bug if the issue ships a patch.
    async fn checkout_and_reintroduce_bug(
        &self,
        task: &str,
        workspace: &Path,
        metadata: &TaskMetadata,
    ) -> Result<(), String> {
        let opts = ExecOptions {
            cwd: Some(workspace.to_path_buf()),
            ..Default::default()
        };

        if let Some(commit) = &metadata.commit_id {
            info!(task, commit, "checking out commit");
            for argv in [
                vec!["git", "reset", "--hard", commit],
                vec!["git", "submodule", "update", "--init", "--recursive"],
            ] {
                let argv: Vec<String> = argv.into_iter().map(String::from).collect();
                let out = self
                    .executor
                    .execute(&argv, &opts)
                    .await
                    .map_err(|e| format!("checkout failed: {e}"))?;
                if !out.is_success() {
                    return Err(format!("checkout failed: {}", out.stderr));
                }
            }
        }

        let patch = self.paths.bug_patch_for(task);
        if patch_is_applicable(&patch) {
            info!(task, patch = %patch.display(), "applying bug reintroduce patch");
            let argv = vec![
                "git".to_string(),
                "apply".to_string(),
                patch.display().to_string(),
            ];
            match self.executor.execute(&argv, &opts).await {
                Ok(out) if out.is_success() => {}
                Ok(out) => warn!(task, stderr = %out.stderr, "failed to apply bug patch"),
                Err(e) => warn!(task, error = %e, "failed to apply bug patch"),
            }
        }

        Ok(())
    }
}

/// A patch file participates only when it exists and is non-empty; anything
/// else is the normal "no patch" path.
fn patch_is_applicable(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}
