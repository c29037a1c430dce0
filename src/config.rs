//! Run configuration and path resolution.
//!
//! A [`RunConfig`] is immutable for the duration of one task's run. All host
//! and container paths the rest of the pipeline needs live in [`BenchPaths`],
//! resolved once at startup so that strategies and runners never read ambient
//! environment state themselves.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agents::AgentKind;

/// Default container image/name used for sandboxed runs.
pub const DEFAULT_CONTAINER: &str = "agentbench-container";

/// Instruction prepended to every task's own instructions.
pub const BASE_INSTRUCTION: &str = "Solve this exercise. Read the test file to understand requirements and implement the solution. Do not run lint/type checks or repeated test loops; run only the exercise tests once.";

/// Container-side mount points. These are contracts with the images we run,
/// not tunables.
pub const WORKSPACE_MOUNT: &str = "/workspace";
pub const HOST_TREE_MOUNT: &str = "/bench-host";
pub const PATCHES_MOUNT: &str = "/patches";
pub const ISSUES_MOUNT: &str = "/app/tests/issues";
pub const SESSION_MOUNT: &str = "/root/.claude";
pub const CLI_CACHE_MOUNT: &str = "/root/.local";
pub const NPM_CACHE_MOUNT: &str = "/root/.npm";
pub const REPO_WORKDIR: &str = "/app/expensify";

/// Which task domain a run draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Self-contained per-exercise directories.
    V1,
    /// A single large repository advanced by commits and diff patches.
    V2,
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetKind::V1 => write!(f, "v1"),
            DatasetKind::V2 => write!(f, "v2"),
        }
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v1" => Ok(DatasetKind::V1),
            "v2" => Ok(DatasetKind::V2),
            other => Err(format!("Unknown dataset: {other} (expected v1 or v2)")),
        }
    }
}

/// Where commands actually execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    /// One-shot `docker run` per phase.
    Docker,
    /// Plain host processes.
    Local,
}

impl std::fmt::Display for SandboxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxKind::Docker => write!(f, "docker"),
            SandboxKind::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for SandboxKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docker" => Ok(SandboxKind::Docker),
            "local" => Ok(SandboxKind::Local),
            other => Err(format!("Unknown sandbox: {other} (expected docker or local)")),
        }
    }
}

/// Configuration for a benchmark run. Built once per invocation and shared by
/// every task iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Agent under test.
    pub agent: AgentKind,
    /// Model identifier passed to the agent CLI.
    pub model: String,
    /// Optional provider routing for the agent (e.g. "openrouter").
    pub provider: Option<String>,
    /// Task domain.
    pub dataset: DatasetKind,
    /// Execution topology.
    pub sandbox: SandboxKind,
    /// Verification command run in the test phase.
    pub test_command: String,
    /// Per-subprocess timeout.
    pub timeout: Duration,
    /// Verbose console output (command echo, diffs, output previews).
    pub verbose: bool,
    /// Poll workspace modification times while the agent runs.
    pub show_progress: bool,
    /// Collect failed attempts alongside successful solutions when results
    /// are archived. Kept for result-archive consumers; the orchestration
    /// pipeline itself does not branch on it.
    pub include_all_solutions: bool,
}

impl RunConfig {
    pub fn new(agent: AgentKind, model: impl Into<String>) -> Self {
        Self {
            agent,
            model: model.into(),
            provider: None,
            dataset: DatasetKind::V1,
            sandbox: SandboxKind::Docker,
            test_command: "corepack yarn && corepack yarn test".to_string(),
            timeout: Duration::from_secs(1800),
            verbose: false,
            show_progress: false,
            include_all_solutions: true,
        }
    }

    pub fn with_dataset(mut self, dataset: DatasetKind) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_sandbox(mut self, sandbox: SandboxKind) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_test_command(mut self, cmd: impl Into<String>) -> Self {
        self.test_command = cmd.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// All host-side paths used by the pipeline, resolved once at startup.
///
/// Strategies receive these explicitly; `prepare()` must stay a pure function
/// of its inputs, so nothing below this struct reads `std::env` or the
/// process working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchPaths {
    /// The orchestrator's own tree (mounted read-only into v2 containers).
    pub host_root: PathBuf,
    /// Exercism-style checkout holding `exercises/practice/<task>`.
    pub exercism_base: PathBuf,
    /// External repository checkout mutated in place by local v2 runs.
    pub repo_checkout: PathBuf,
    /// Per-issue data (commit ids, bug patches) for v2 tasks.
    pub issues_dir: PathBuf,
    /// v2 task manifest (JSONL, one task record per line).
    pub manifest: PathBuf,
    /// Writable directory where generated patches land.
    pub patches_dir: PathBuf,
    /// Host cache bound to the container's CLI install prefix.
    pub cli_cache_dir: PathBuf,
    /// Host cache bound to the container's npm cache.
    pub npm_cache_dir: PathBuf,
    /// Agent session directory (`~/.claude`), bound for log capture.
    pub session_dir: PathBuf,
    /// Where results and collected logs are written.
    pub results_dir: PathBuf,
}

impl BenchPaths {
    /// Resolves paths relative to `host_root`, honoring the cache override
    /// environment variables. This is the single place ambient state is read.
    pub fn resolve(host_root: impl Into<PathBuf>) -> Self {
        let host_root = host_root.into();
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        let cache_base = home.join(".cache").join("agentbench");

        Self {
            exercism_base: host_root.join("exercism-typescript"),
            repo_checkout: home.join("repos").join("expensify-app"),
            issues_dir: host_root.join("repos").join("swelancer").join("issues"),
            manifest: host_root.join("repos").join("swelancer").join("tasks.jsonl"),
            patches_dir: host_root.join(".patches"),
            cli_cache_dir: env_path_or("AGENTBENCH_CLI_CACHE", cache_base.join("cli")),
            npm_cache_dir: env_path_or("AGENTBENCH_NPM_CACHE", cache_base.join("npm")),
            session_dir: home.join(".claude"),
            results_dir: host_root.join("results"),
            host_root,
        }
    }

    /// Host workspace for a task: the per-exercise directory in v1, the
    /// shared checkout in v2.
    pub fn workspace_for(&self, dataset: DatasetKind, task: &str) -> PathBuf {
        match dataset {
            DatasetKind::V1 => self
                .exercism_base
                .join("exercises")
                .join("practice")
                .join(task),
            DatasetKind::V2 => self.repo_checkout.clone(),
        }
    }

    /// Where the bug-reintroduction patch for a v2 task lives, if any.
    pub fn bug_patch_for(&self, task: &str) -> PathBuf {
        self.issues_dir.join(task).join("bug_reintroduce.patch")
    }
}

fn env_path_or(var: &str, default: PathBuf) -> PathBuf {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v),
        _ => default,
    }
}

/// Path of the agent wrapper script as seen from where the agent executes.
pub fn agent_script_path(sandbox: SandboxKind, dataset: DatasetKind, host_root: &Path) -> String {
    match (sandbox, dataset) {
        (SandboxKind::Docker, DatasetKind::V2) => {
            format!("{HOST_TREE_MOUNT}/scripts/run-agent.sh")
        }
        (SandboxKind::Docker, DatasetKind::V1) => "/app/scripts/run-agent.sh".to_string(),
        (SandboxKind::Local, _) => host_root
            .join("scripts")
            .join("run-agent.sh")
            .to_string_lossy()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_kind_parse() {
        assert_eq!("v1".parse::<DatasetKind>().unwrap(), DatasetKind::V1);
        assert_eq!("V2".parse::<DatasetKind>().unwrap(), DatasetKind::V2);
        assert!("v3".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_workspace_for() {
        let paths = BenchPaths::resolve("/bench");
        assert_eq!(
            paths.workspace_for(DatasetKind::V1, "acronym"),
            PathBuf::from("/bench/exercism-typescript/exercises/practice/acronym")
        );
        assert_eq!(paths.workspace_for(DatasetKind::V2, "12345"), paths.repo_checkout);
    }

    #[test]
    fn test_agent_script_path() {
        assert_eq!(
            agent_script_path(SandboxKind::Docker, DatasetKind::V2, Path::new("/x")),
            "/bench-host/scripts/run-agent.sh"
        );
        assert_eq!(
            agent_script_path(SandboxKind::Docker, DatasetKind::V1, Path::new("/x")),
            "/app/scripts/run-agent.sh"
        );
        assert!(
            agent_script_path(SandboxKind::Local, DatasetKind::V1, Path::new("/x"))
                .starts_with("/x/scripts")
        );
    }

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::new(AgentKind::Claude, "sonnet");
        assert_eq!(config.dataset, DatasetKind::V1);
        assert_eq!(config.sandbox, SandboxKind::Docker);
        assert_eq!(config.timeout, Duration::from_secs(1800));
        assert!(config.include_all_solutions);
    }
}
