//! Exercism-style (v1) dataset: one directory per exercise under
//! `exercises/practice/`, instructions in `.docs/instructions.md`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::fs;
use tracing::warn;

use super::{DatasetError, DatasetReader, TaskFiles, TaskMetadata};

static TEST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\.test\.",     // .test.ts, .test.py, ...
        r"_test\.",      // _test.js, _test.py, ...
        r"\.spec\.",     // .spec.ts, ...
        r"_spec\.",      // _spec.js, ...
        r"^test_.*\.py$",
        r".*_test\.py$",
        r".*Test\.",     // *Test.java
        r"^Test.*\.",    // Test*.java
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static SOURCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\.ts$", r"\.js$", r"\.jsx$", r"\.tsx$"]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
});

fn is_test_file(name: &str) -> bool {
    TEST_PATTERNS.iter().any(|p| p.is_match(name))
}

fn is_source_file(name: &str) -> bool {
    SOURCE_PATTERNS.iter().any(|p| p.is_match(name)) && !is_test_file(name)
}

/// Reader over an Exercism-style checkout.
pub struct ExercismDataset {
    base_path: PathBuf,
}

impl ExercismDataset {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn practice_dir(&self) -> PathBuf {
        self.base_path.join("exercises").join("practice")
    }

    fn exercise_dir(&self, task: &str) -> PathBuf {
        self.practice_dir().join(task)
    }

    async fn list_entries(&self, dir: &Path) -> Result<Vec<String>, DatasetError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }
}

#[async_trait]
impl DatasetReader for ExercismDataset {
    async fn tasks(&self) -> Result<Vec<String>, DatasetError> {
        let dir = self.practice_dir();
        let mut tasks = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().await?.is_dir() && !name.starts_with('.') {
                tasks.push(name);
            }
        }
        tasks.sort();
        Ok(tasks)
    }

    async fn task_files(&self, task: &str) -> Result<TaskFiles, DatasetError> {
        let dir = self.exercise_dir(task);
        let entries = match self.list_entries(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(task, error = %e, "could not read exercise files");
                return Ok(TaskFiles::default());
            }
        };

        Ok(TaskFiles {
            source_files: entries
                .iter()
                .filter(|f| is_source_file(f))
                .cloned()
                .collect(),
            test_files: entries.iter().filter(|f| is_test_file(f)).cloned().collect(),
        })
    }

    async fn metadata(&self, task: &str) -> Result<TaskMetadata, DatasetError> {
        Ok(TaskMetadata {
            commit_id: None,
            title: Some(task.to_string()),
        })
    }

    async fn instructions(
        &self,
        task: &str,
        base_instruction: &str,
        custom_instruction: Option<&str>,
    ) -> Result<String, DatasetError> {
        let wrap = |source: std::io::Error| DatasetError::Instructions {
            task: task.to_string(),
            source,
        };

        let environment = fs::read_to_string(self.base_path.join("CLAUDE.md"))
            .await
            .map_err(wrap)?;
        let exercise_instructions = fs::read_to_string(
            self.exercise_dir(task).join(".docs").join("instructions.md"),
        )
        .await
        .map_err(wrap)?;

        let mut full = format!("{base_instruction}\n\n{exercise_instructions}\n\n{environment}");
        if let Some(custom) = custom_instruction {
            full.push_str("\n\n");
            full.push_str(custom);
        }
        Ok(full)
    }
}
