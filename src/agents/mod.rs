//! Agent command builders.
//!
//! Each builder knows how to turn instructions into an abstract
//! [`Command`](crate::exec::Command) invoking one agent CLI through the
//! run-agent wrapper script. The registry is a closed enum; construction for
//! an unknown kind fails explicitly instead of falling through.

pub mod claude;
pub mod codex;
pub mod copilot;
pub mod kimi;

use serde::{Deserialize, Serialize};

use crate::dataset::TaskFiles;
use crate::exec::Command;

pub use claude::ClaudeBuilder;
pub use codex::CodexBuilder;
pub use copilot::CopilotBuilder;
pub use kimi::KimiBuilder;

/// Supported agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Codex,
    Copilot,
    Kimi,
}

impl AgentKind {
    /// The CLI name passed to the agent wrapper script.
    pub fn cli_name(&self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
            AgentKind::Copilot => "copilot",
            AgentKind::Kimi => "kimi",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cli_name())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" => Ok(AgentKind::Claude),
            "codex" => Ok(AgentKind::Codex),
            "copilot" => Ok(AgentKind::Copilot),
            "kimi" => Ok(AgentKind::Kimi),
            other => Err(format!("Unknown agent: {other}")),
        }
    }
}

/// Per-run options shared by all builders.
#[derive(Debug, Clone)]
pub struct BuilderOptions {
    pub model: String,
    pub provider: Option<String>,
    /// Path of the run-agent wrapper script as seen from where the agent
    /// executes (host path locally, container path in Docker).
    pub script_path: String,
}

/// Errors surfaced at command-build time. These are configuration errors:
/// fatal for the current task's invocation attempt, raised before anything
/// is executed.
#[derive(Debug, thiserror::Error)]
pub enum AgentBuildError {
    #[error("Missing {var} for {agent} ({provider}) provider")]
    MissingEnv {
        agent: &'static str,
        provider: String,
        var: &'static str,
    },

    #[error("Unsupported provider for {agent}: {provider}")]
    UnsupportedProvider {
        agent: &'static str,
        provider: String,
    },
}

/// Builds the abstract command invoking one agent CLI.
pub trait AgentBuilder: Send + Sync {
    fn build_command(
        &self,
        instructions: &str,
        file_list: Option<&TaskFiles>,
    ) -> Result<Command, AgentBuildError>;
}

/// Creates the builder for an agent kind. The enum is closed, so every kind
/// maps to exactly one builder.
pub fn create_builder(kind: AgentKind, options: BuilderOptions) -> Box<dyn AgentBuilder> {
    match kind {
        AgentKind::Claude => Box::new(ClaudeBuilder::new(options)),
        AgentKind::Codex => Box::new(CodexBuilder::new(options)),
        AgentKind::Copilot => Box::new(CopilotBuilder::new(options)),
        AgentKind::Kimi => Box::new(KimiBuilder::new(options)),
    }
}

pub(crate) fn require_env(
    agent: &'static str,
    provider: &str,
    var: &'static str,
) -> Result<String, AgentBuildError> {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(AgentBuildError::MissingEnv {
            agent,
            provider: provider.to_string(),
            var,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_kind_parse() {
        assert_eq!("claude".parse::<AgentKind>().unwrap(), AgentKind::Claude);
        assert_eq!("Codex".parse::<AgentKind>().unwrap(), AgentKind::Codex);
        assert!("cursor".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_every_kind_has_a_builder() {
        for kind in [
            AgentKind::Claude,
            AgentKind::Codex,
            AgentKind::Copilot,
            AgentKind::Kimi,
        ] {
            let options = BuilderOptions {
                model: "m".into(),
                provider: None,
                script_path: "/s/run-agent.sh".into(),
            };
            let _ = create_builder(kind, options);
        }
    }
}
