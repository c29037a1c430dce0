//! Batch benchmark loop.
//!
//! Resolves the task list from the dataset, runs each task strictly
//! sequentially, and aggregates the per-task results. Tasks never run
//! concurrently: v1 workspaces and the v2 checkout are shared mutable
//! state, and interleaved agent sessions would corrupt them.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::config::{DatasetKind, RunConfig, SandboxKind};
use crate::dataset::{DatasetError, DatasetReader};
use crate::runner::{TaskResult, TaskRunner};

/// Pause between consecutive tasks, giving external services a breather.
const INTER_TASK_DELAY: Duration = Duration::from_secs(1);

/// Which tasks of the dataset to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSelection {
    /// The first task the dataset lists. Default when nothing is specified.
    First,
    /// One task by name.
    Single(String),
    /// An explicit list of task names, run in the given order.
    List(Vec<String>),
    /// The first `n` tasks the dataset lists.
    Count(usize),
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("unknown task '{0}'")]
    UnknownTask(String),
    #[error("dataset contains no tasks")]
    EmptyDataset,
}

/// Default verification command for a dataset/sandbox combination.
///
/// v2 in Docker runs the repo's own test harness: the setup playbook is
/// started in the background and polled for up to two minutes before the
/// test playbook is invoked.
pub fn default_test_command(dataset: DatasetKind, sandbox: SandboxKind) -> String {
    match (dataset, sandbox) {
        (DatasetKind::V1, _) => "corepack yarn && corepack yarn test".to_string(),
        (DatasetKind::V2, SandboxKind::Docker) => concat!(
            "export CI=true && /app/tests/run.sh & ",
            "for i in {1..120}; do [ -f /setup_done.txt ] && break; sleep 1; done; ",
            "if [ ! -f /setup_done.txt ]; then echo \"setup did not complete\"; exit 1; fi; ",
            "ansible-playbook -i \"localhost,\" --connection=local /app/tests/run_tests.yml",
        )
        .to_string(),
        (DatasetKind::V2, SandboxKind::Local) => "npm rebuild canvas && npm test -- -o".to_string(),
    }
}

/// Resolves a selection against the dataset's task list. Naming a task the
/// dataset does not know is fatal for the whole run.
pub async fn select_tasks(
    dataset: &dyn DatasetReader,
    selection: &TaskSelection,
) -> Result<Vec<String>, BenchError> {
    let available = dataset.tasks().await?;
    if available.is_empty() {
        return Err(BenchError::EmptyDataset);
    }

    let selected = match selection {
        TaskSelection::First => vec![available[0].clone()],
        TaskSelection::Count(n) => available.iter().take(*n).cloned().collect(),
        TaskSelection::Single(name) => vec![name.clone()],
        TaskSelection::List(names) => names.clone(),
    };

    for task in &selected {
        if !available.contains(task) {
            return Err(BenchError::UnknownTask(task.clone()));
        }
    }
    Ok(selected)
}

pub struct BenchmarkRunner {
    dataset: Arc<dyn DatasetReader>,
    task_runner: TaskRunner,
}

impl BenchmarkRunner {
    pub fn new(dataset: Arc<dyn DatasetReader>, task_runner: TaskRunner) -> Self {
        Self {
            dataset,
            task_runner,
        }
    }

    pub async fn run(
        &self,
        config: &RunConfig,
        selection: &TaskSelection,
    ) -> Result<Vec<TaskResult>, BenchError> {
        let tasks = select_tasks(self.dataset.as_ref(), selection).await?;
        info!(
            count = tasks.len(),
            agent = %config.agent,
            model = %config.model,
            "starting benchmark run"
        );

        let mut results = Vec::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_TASK_DELAY).await;
            }
            results.push(self.task_runner.run(config, task).await);
        }
        Ok(results)
    }
}
