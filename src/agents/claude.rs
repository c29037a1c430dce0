//! Claude Code builder.

use std::collections::BTreeMap;

use crate::dataset::TaskFiles;
use crate::exec::Command;

use super::{require_env, AgentBuildError, AgentBuilder, BuilderOptions};

/// Builds Claude Code invocations, optionally routed through an
/// Anthropic-compatible proxy provider.
pub struct ClaudeBuilder {
    options: BuilderOptions,
}

impl ClaudeBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self { options }
    }

    fn environment(&self) -> Result<BTreeMap<String, String>, AgentBuildError> {
        let provider = self.options.provider.as_deref().unwrap_or("anthropic");
        let mut env = BTreeMap::new();

        match provider {
            "deepseek" => {
                let key = require_env("Claude", provider, "DEEPSEEK_API_KEY")?;
                env.insert("ANTHROPIC_API_KEY".to_string(), key.clone());
                env.insert("ANTHROPIC_AUTH_TOKEN".to_string(), key);
                env.insert(
                    "ANTHROPIC_BASE_URL".to_string(),
                    "https://api.deepseek.com/anthropic".to_string(),
                );
            }
            "moonshot" => {
                let key = require_env("Claude", provider, "MOONSHOT_API_KEY")?;
                env.insert("ANTHROPIC_API_KEY".to_string(), key.clone());
                env.insert("ANTHROPIC_AUTH_TOKEN".to_string(), key);
                env.insert(
                    "ANTHROPIC_BASE_URL".to_string(),
                    "https://api.moonshot.ai/anthropic".to_string(),
                );
            }
            "zai" => {
                let key = require_env("Claude", provider, "ZAI_API_KEY")?;
                env.insert("ANTHROPIC_API_KEY".to_string(), key.clone());
                env.insert("ANTHROPIC_AUTH_TOKEN".to_string(), key);
                env.insert(
                    "ANTHROPIC_BASE_URL".to_string(),
                    "https://api.z.ai/api/anthropic".to_string(),
                );
            }
            "openrouter" => {
                let key = require_env("Claude", provider, "OPENROUTER_API_KEY")?;
                // The CLI authenticates with the auth token; the API key is
                // forwarded empty so an inherited Anthropic key cannot win.
                env.insert("ANTHROPIC_API_KEY".to_string(), String::new());
                env.insert("ANTHROPIC_AUTH_TOKEN".to_string(), key);
                env.insert(
                    "ANTHROPIC_BASE_URL".to_string(),
                    std::env::var("ANTHROPIC_BASE_URL")
                        .unwrap_or_else(|_| "https://openrouter.ai/api".to_string()),
                );
            }
            _ => {
                // API key is optional here: the CLI may use its own OAuth.
                if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
                    if !key.is_empty() {
                        env.insert("ANTHROPIC_API_KEY".to_string(), key);
                    }
                }
            }
        }

        Ok(env)
    }
}

impl AgentBuilder for ClaudeBuilder {
    fn build_command(
        &self,
        instructions: &str,
        _file_list: Option<&TaskFiles>,
    ) -> Result<Command, AgentBuildError> {
        let args = vec![
            "bash".to_string(),
            self.options.script_path.clone(),
            "claude".to_string(),
            "--debug".to_string(),
            "--verbose".to_string(),
            "--dangerously-skip-permissions".to_string(),
            "--model".to_string(),
            self.options.model.clone(),
            "-p".to_string(),
            instructions.to_string(),
        ];

        Ok(Command {
            args,
            env: self.environment()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(provider: Option<&str>) -> BuilderOptions {
        BuilderOptions {
            model: "claude-sonnet".into(),
            provider: provider.map(String::from),
            script_path: "/tmp/scripts/run-agent.sh".into(),
        }
    }

    #[test]
    fn test_core_args() {
        let cmd = ClaudeBuilder::new(options(None))
            .build_command("Test instructions", None)
            .unwrap();
        assert_eq!(
            &cmd.args[..3],
            &["bash", "/tmp/scripts/run-agent.sh", "claude"]
        );
        assert!(cmd.args.contains(&"--model".to_string()));
        assert!(cmd.args.contains(&"claude-sonnet".to_string()));
        let p = cmd.args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(cmd.args[p + 1], "Test instructions");
    }

    #[test]
    fn test_unknown_provider_falls_back_to_default_auth() {
        // Default path never fails: the CLI can authenticate on its own.
        let cmd = ClaudeBuilder::new(options(Some("anthropic")))
            .build_command("x", None)
            .unwrap();
        assert!(!cmd.args.is_empty());
    }
}
