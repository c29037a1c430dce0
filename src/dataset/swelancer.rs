//! SWE-Lancer-style (v2) dataset: repository issues described by a JSONL
//! manifest, one task record per line, plus per-issue data directories
//! holding `commit_id.txt` and optional bug patches.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::warn;

use super::{DatasetError, DatasetReader, TaskFiles, TaskMetadata};

#[derive(Debug, Clone, Deserialize)]
struct SweLancerTask {
    question_id: String,
    variant: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

/// Reader over a SWE-Lancer task manifest.
pub struct SweLancerDataset {
    manifest: PathBuf,
    issues_dir: PathBuf,
    tasks: OnceCell<Vec<SweLancerTask>>,
}

impl SweLancerDataset {
    pub fn new(manifest: impl Into<PathBuf>, issues_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            issues_dir: issues_dir.into(),
            tasks: OnceCell::new(),
        }
    }

    async fn load_tasks(&self) -> Result<&Vec<SweLancerTask>, DatasetError> {
        self.tasks
            .get_or_try_init(|| async {
                let content = fs::read_to_string(&self.manifest).await?;
                let mut tasks = Vec::new();
                for (lineno, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let task: SweLancerTask =
                        serde_json::from_str(line).map_err(|e| DatasetError::Manifest {
                            path: self.manifest.display().to_string(),
                            reason: format!("line {}: {e}", lineno + 1),
                        })?;
                    // Only individual-contributor SWE tasks are runnable here.
                    if task.variant == "ic_swe" {
                        tasks.push(task);
                    }
                }
                Ok(tasks)
            })
            .await
    }

    async fn find_task(&self, task: &str) -> Result<SweLancerTask, DatasetError> {
        self.load_tasks()
            .await?
            .iter()
            .find(|t| t.question_id == task)
            .cloned()
            .ok_or_else(|| DatasetError::TaskNotFound(task.to_string()))
    }
}

#[async_trait]
impl DatasetReader for SweLancerDataset {
    async fn tasks(&self) -> Result<Vec<String>, DatasetError> {
        Ok(self
            .load_tasks()
            .await?
            .iter()
            .map(|t| t.question_id.clone())
            .collect())
    }

    async fn task_files(&self, _task: &str) -> Result<TaskFiles, DatasetError> {
        // Issues live in a large repository; the agent discovers files itself.
        Ok(TaskFiles::default())
    }

    async fn metadata(&self, task: &str) -> Result<TaskMetadata, DatasetError> {
        let record = self.find_task(task).await?;

        let commit_path = self.issues_dir.join(task).join("commit_id.txt");
        let commit_id = match fs::read_to_string(&commit_path).await {
            Ok(content) => Some(content.trim().to_string()),
            Err(e) => {
                warn!(task, path = %commit_path.display(), error = %e, "no commit_id.txt");
                None
            }
        };

        Ok(TaskMetadata {
            commit_id,
            title: Some(record.title),
        })
    }

    async fn instructions(
        &self,
        task: &str,
        base_instruction: &str,
        custom_instruction: Option<&str>,
    ) -> Result<String, DatasetError> {
        let record = self.find_task(task).await?;

        let mut text = format!("{base_instruction}\n\n");
        text.push_str(&format!("# Task: {}\n\n", record.title));
        text.push_str(&format!("## Description\n{}\n\n", record.description));
        text.push_str(
            "## Goal\nFix the bug described above. You should explore the codebase to \
             identify the issue. The current working directory is the root of the app.\n",
        );
        if let Some(custom) = custom_instruction {
            text.push_str("\n\n");
            text.push_str(custom);
        }
        Ok(text)
    }
}
