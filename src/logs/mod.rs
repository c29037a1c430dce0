//! Agent log collection and secret redaction.
//!
//! After each agent phase the collector for the invoked agent saves whatever
//! logs that agent produced, independent of success or failure. Everything
//! written to disk or echoed to the console passes through [`redact`].

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::fs;
use tracing::{info, warn};

use crate::agents::AgentKind;
use crate::config::{BenchPaths, DatasetKind, RunConfig, SandboxKind};
use crate::executor::CommandOutput;

static KEY_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_]*(?:API_KEY|TOKEN|SECRET)[A-Za-z_]*\s*[=:]\s*)\S+").expect("static pattern")
});
static SK_SECRET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-[A-Za-z0-9_-]{8,}").expect("static pattern"));
static BEARER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+\S+").expect("static pattern"));

/// Masks API keys, bearer tokens and raw secrets in free-form text.
pub fn redact(text: &str) -> String {
    let text = KEY_ASSIGNMENT.replace_all(text, "$1***");
    let text = SK_SECRET.replace_all(&text, "sk-***");
    BEARER.replace_all(&text, "Bearer ***").to_string()
}

const COMMAND_ECHO_LIMIT: usize = 1024;

/// Renders an argument vector for console echo, masking secrets and
/// truncating very long command lines.
pub fn sanitize_command(args: &[String]) -> String {
    let command = args
        .iter()
        .map(|arg| redact(arg))
        .collect::<Vec<_>>()
        .join(" ");
    if command.len() > COMMAND_ECHO_LIMIT {
        // Instruction text is embedded in the argv and is frequently
        // non-ASCII; the cut must land on a char boundary.
        let mut cut = COMMAND_ECHO_LIMIT;
        while !command.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &command[..cut])
    } else {
        command
    }
}

/// Saves an agent's logs after a phase.
#[async_trait]
pub trait LogCollector: Send + Sync {
    async fn collect(
        &self,
        config: &RunConfig,
        task: &str,
        workspace: &Path,
        output: &CommandOutput,
    );
}

/// Picks the collector for an agent kind.
pub fn collector_for(agent: AgentKind, paths: &BenchPaths) -> Box<dyn LogCollector> {
    match agent {
        AgentKind::Claude => Box::new(ClaudeLogCollector {
            session_dir: paths.session_dir.clone(),
            results_dir: paths.results_dir.clone(),
            repo_checkout: paths.repo_checkout.clone(),
        }),
        _ => Box::new(GenericLogCollector {
            results_dir: paths.results_dir.clone(),
        }),
    }
}

fn log_dir(results_dir: &Path, config: &RunConfig) -> PathBuf {
    results_dir.join(config.agent.cli_name()).join("logs")
}

/// Collects Claude Code session transcripts from the session projects
/// directory.
pub struct ClaudeLogCollector {
    session_dir: PathBuf,
    results_dir: PathBuf,
    repo_checkout: PathBuf,
}

impl ClaudeLogCollector {
    /// Claude derives a per-project directory name by flattening the
    /// workspace's absolute path: `/a/b/c` becomes `-a-b-c`.
    fn project_dir_name(workspace: &Path) -> String {
        workspace
            .display()
            .to_string()
            .replace(['/', '\\'], "-")
            .replace(':', "")
    }

    fn project_dir(&self, config: &RunConfig, workspace: &Path) -> PathBuf {
        let projects = self.session_dir.join("projects");
        match (config.dataset, config.sandbox) {
            // In v2 containers the agent runs under /app.
            (DatasetKind::V2, SandboxKind::Docker) => projects.join("-app"),
            (DatasetKind::V2, SandboxKind::Local) => {
                projects.join(Self::project_dir_name(&self.repo_checkout))
            }
            _ => projects.join(Self::project_dir_name(workspace)),
        }
    }

    async fn newest_jsonl(dir: &Path) -> Option<PathBuf> {
        let mut entries = fs::read_dir(dir).await.ok()?;
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().map(|e| e == "jsonl").unwrap_or(false) {
                let Some(mtime) = entry.metadata().await.ok().and_then(|m| m.modified().ok())
                else {
                    continue;
                };
                if newest.as_ref().map(|(t, _)| mtime > *t).unwrap_or(true) {
                    newest = Some((mtime, path));
                }
            }
        }
        newest.map(|(_, p)| p)
    }
}

#[async_trait]
impl LogCollector for ClaudeLogCollector {
    async fn collect(
        &self,
        config: &RunConfig,
        task: &str,
        workspace: &Path,
        _output: &CommandOutput,
    ) {
        let log_dir = log_dir(&self.results_dir, config);
        if let Err(e) = fs::create_dir_all(&log_dir).await {
            warn!(task, error = %e, "could not create log directory");
            return;
        }

        let project_dir = self.project_dir(config, workspace);
        let Some(jsonl) = Self::newest_jsonl(&project_dir).await else {
            info!(task, dir = %project_dir.display(), "no session logs found");
            return;
        };

        match fs::read_to_string(&jsonl).await {
            Ok(content) => {
                let log_file = log_dir.join(format!("{task}.log"));
                if let Err(e) = fs::write(&log_file, redact(&content)).await {
                    warn!(task, error = %e, "could not write collected log");
                } else {
                    info!(task, file = %log_file.display(), "saved session log");
                }
            }
            Err(e) => warn!(task, error = %e, "could not read session log"),
        }
    }
}

/// Fallback collector: saves the captured stdout/stderr.
pub struct GenericLogCollector {
    results_dir: PathBuf,
}

#[async_trait]
impl LogCollector for GenericLogCollector {
    async fn collect(
        &self,
        config: &RunConfig,
        task: &str,
        _workspace: &Path,
        output: &CommandOutput,
    ) {
        let log_dir = log_dir(&self.results_dir, config);
        if let Err(e) = fs::create_dir_all(&log_dir).await {
            warn!(task, error = %e, "could not create log directory");
            return;
        }

        let content = format!("STDOUT:\n{}\n\nSTDERR:\n{}", output.stdout, output.stderr);
        let log_file = log_dir.join(format!("{task}.log"));
        if let Err(e) = fs::write(&log_file, redact(&content)).await {
            warn!(task, error = %e, "could not write log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;

    #[test]
    fn test_redact_key_assignments() {
        let text = "ANTHROPIC_API_KEY=sk-abcdef1234567890 MY_TOKEN: tok123";
        let redacted = redact(text);
        assert!(redacted.contains("ANTHROPIC_API_KEY=***"));
        assert!(redacted.contains("MY_TOKEN: ***"));
        assert!(!redacted.contains("tok123"));
    }

    #[test]
    fn test_redact_bare_secrets() {
        let redacted = redact("auth with sk-1234567890abcdef and Bearer eyJhbGci.x");
        assert!(redacted.contains("sk-***"));
        assert!(redacted.contains("Bearer ***"));
        assert!(!redacted.contains("eyJhbGci"));
    }

    #[test]
    fn test_sanitize_command_truncates() {
        let args = vec!["x".repeat(2000)];
        let echo = sanitize_command(&args);
        assert!(echo.len() <= 1027);
        assert!(echo.ends_with("..."));
    }

    #[test]
    fn test_sanitize_command_cuts_on_char_boundary() {
        // A two-byte char straddling the truncation limit must not panic.
        let mut arg = "a".repeat(1023);
        arg.push('é');
        arg.push_str(&"b".repeat(100));
        let echo = sanitize_command(&[arg]);
        assert!(echo.ends_with("..."));
        assert_eq!(echo.trim_end_matches("..."), "a".repeat(1023));

        // Multibyte-heavy text truncates without panicking too.
        let echo = sanitize_command(&["日本語のテキスト".repeat(100)]);
        assert!(echo.ends_with("..."));
        assert!(echo.len() <= 1027);
    }

    #[test]
    fn test_project_dir_name_flattening() {
        assert_eq!(
            ClaudeLogCollector::project_dir_name(Path::new("/home/u/bench/exercises/acronym")),
            "-home-u-bench-exercises-acronym"
        );
    }

    #[tokio::test]
    async fn test_generic_collector_writes_redacted_log() {
        let dir = tempfile::tempdir().unwrap();
        let collector = GenericLogCollector {
            results_dir: dir.path().to_path_buf(),
        };
        let config = RunConfig::new(AgentKind::Codex, "gpt-5");
        let output = CommandOutput {
            exit_code: 0,
            stdout: "used OPENAI_API_KEY=sk-verysecretvalue".to_string(),
            stderr: String::new(),
        };

        collector
            .collect(&config, "acronym", Path::new("/w"), &output)
            .await;

        let log = std::fs::read_to_string(dir.path().join("codex/logs/acronym.log")).unwrap();
        assert!(log.contains("OPENAI_API_KEY=***"));
        assert!(!log.contains("verysecretvalue"));
    }

    #[tokio::test]
    async fn test_claude_collector_missing_sessions_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let collector = ClaudeLogCollector {
            session_dir: dir.path().join("nope"),
            results_dir: dir.path().to_path_buf(),
            repo_checkout: dir.path().join("repo"),
        };
        let config = RunConfig::new(AgentKind::Claude, "sonnet");
        let output = CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        };
        collector
            .collect(&config, "acronym", Path::new("/w"), &output)
            .await;
    }
}
