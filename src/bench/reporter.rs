//! Result reporting: console summary and JSON export.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::runner::TaskResult;

#[derive(Debug, Serialize)]
pub struct BenchmarkReport<'a> {
    /// Unique id of this run, for correlating reports with collected logs.
    pub run_id: Uuid,
    pub agent: String,
    pub model: String,
    pub dataset: String,
    pub sandbox: String,
    pub timestamp: String,
    pub total: usize,
    pub passed: usize,
    pub results: &'a [TaskResult],
}

impl<'a> BenchmarkReport<'a> {
    pub fn new(config: &RunConfig, results: &'a [TaskResult]) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            agent: config.agent.to_string(),
            model: config.model.clone(),
            dataset: config.dataset.to_string(),
            sandbox: config.sandbox.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            total: results.len(),
            passed: results.iter().filter(|r| r.overall_success).count(),
            results,
        }
    }

    /// Prints a per-task summary table followed by the pass count.
    pub fn print_summary(&self) {
        println!();
        println!("Benchmark results ({} on {}):", self.agent, self.model);
        println!("{:<40} {:>7} {:>7} {:>9}", "task", "agent", "test", "time");
        for result in self.results {
            println!(
                "{:<40} {:>7} {:>7} {:>8.1}s",
                result.task,
                mark(result.agent.success),
                mark(result.test.success),
                result.total_duration.as_secs_f64(),
            );
        }
        println!();
        println!("passed {}/{}", self.passed, self.total);
    }

    /// Writes the report as pretty JSON into `results_dir`, returning the
    /// path of the written file.
    pub fn export_json(&self, results_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(results_dir).with_context(|| {
            format!("could not create results directory {}", results_dir.display())
        })?;

        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let path = results_dir.join(format!(
            "benchmark-{}-{}-{stamp}.json",
            self.agent,
            filename_safe(&self.model)
        ));
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, body)
            .with_context(|| format!("could not write report to {}", path.display()))?;
        Ok(path)
    }
}

fn mark(success: bool) -> &'static str {
    if success {
        "pass"
    } else {
        "FAIL"
    }
}

/// Model names may carry provider prefixes like `org/model`.
fn filename_safe(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect()
}
