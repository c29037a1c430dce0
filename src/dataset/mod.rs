//! Task datasets.
//!
//! A [`DatasetReader`] supplies the task list, per-task file names, metadata
//! and a fully composed instruction string. One implementation exists per
//! task domain: [`exercism`] for v1 per-exercise directories, [`swelancer`]
//! for v2 repository issues.

pub mod exercism;
pub mod swelancer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use exercism::ExercismDataset;
pub use swelancer::SweLancerDataset;

/// Source and test file names for one task (relative to its workspace).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFiles {
    pub source_files: Vec<String>,
    pub test_files: Vec<String>,
}

/// Per-task metadata, resolved once at the start of a task's run and reused
/// by both phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub commit_id: Option<String>,
    pub title: Option<String>,
}

/// Errors from dataset access.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Failed to read instructions for '{task}': {source}")]
    Instructions {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse task manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies tasks, their files and their instructions.
#[async_trait]
pub trait DatasetReader: Send + Sync {
    /// All available task identifiers, sorted.
    async fn tasks(&self) -> Result<Vec<String>, DatasetError>;

    /// Source and test files for a task.
    async fn task_files(&self, task: &str) -> Result<TaskFiles, DatasetError>;

    /// Just the test files for a task.
    async fn test_files(&self, task: &str) -> Result<Vec<String>, DatasetError> {
        Ok(self.task_files(task).await?.test_files)
    }

    /// Metadata (commit id, title) for a task.
    async fn metadata(&self, task: &str) -> Result<TaskMetadata, DatasetError>;

    /// The fully composed instruction text handed to the agent.
    async fn instructions(
        &self,
        task: &str,
        base_instruction: &str,
        custom_instruction: Option<&str>,
    ) -> Result<String, DatasetError>;
}
