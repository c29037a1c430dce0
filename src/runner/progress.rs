//! Cosmetic progress reporting for long agent phases.
//!
//! Polls the workspace for recently modified files on an interval and logs
//! what the agent appears to be touching. Purely informational; stopping the
//! monitor never affects phase control flow.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::info;
use walkdir::WalkDir;

pub struct ProgressMonitor {
    handle: JoinHandle<()>,
}

impl ProgressMonitor {
    /// Spawns the polling loop. `interval` is how often the workspace is
    /// scanned.
    pub fn start(workspace: PathBuf, task: String, interval: Duration) -> Self {
        let started = SystemTime::now();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;
                let touched = recently_modified(&workspace, started);
                if touched.is_empty() {
                    info!(task, "agent running, no file changes yet");
                } else {
                    info!(task, files = touched.len(), recent = ?touched.last(), "agent activity");
                }
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

fn recently_modified(workspace: &std::path::Path, since: SystemTime) -> Vec<String> {
    WalkDir::new(workspace)
        .max_depth(4)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.path().components().any(|c| c.as_os_str() == ".git"))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            (modified > since).then(|| e.path().display().to_string())
        })
        .collect()
}
