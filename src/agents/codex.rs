//! Codex CLI builder.

use std::collections::BTreeMap;

use crate::dataset::TaskFiles;
use crate::exec::Command;

use super::{require_env, AgentBuildError, AgentBuilder, BuilderOptions};

pub struct CodexBuilder {
    options: BuilderOptions,
}

impl CodexBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self { options }
    }

    fn environment(&self) -> Result<BTreeMap<String, String>, AgentBuildError> {
        let provider = self.options.provider.as_deref().unwrap_or("openai");
        let mut env = BTreeMap::new();

        match provider {
            "openrouter" => {
                let key = require_env("Codex", provider, "OPENROUTER_API_KEY")?;
                env.insert("OPENROUTER_API_KEY".to_string(), key);
            }
            "openai" => {
                let key = std::env::var("CODEX_API_KEY")
                    .or_else(|_| std::env::var("OPENAI_API_KEY"))
                    .ok()
                    .filter(|v| !v.is_empty())
                    .ok_or(AgentBuildError::MissingEnv {
                        agent: "Codex",
                        provider: provider.to_string(),
                        var: "CODEX_API_KEY or OPENAI_API_KEY",
                    })?;
                env.insert("CODEX_API_KEY".to_string(), key);
            }
            other => {
                return Err(AgentBuildError::UnsupportedProvider {
                    agent: "Codex",
                    provider: other.to_string(),
                })
            }
        }

        Ok(env)
    }
}

impl AgentBuilder for CodexBuilder {
    fn build_command(
        &self,
        instructions: &str,
        _file_list: Option<&TaskFiles>,
    ) -> Result<Command, AgentBuildError> {
        let provider = self.options.provider.as_deref().unwrap_or("openai");
        let args = vec![
            "bash".to_string(),
            self.options.script_path.clone(),
            "codex".to_string(),
            "exec".to_string(),
            "-c".to_string(),
            "model_reasoning_effort=high".to_string(),
            "-c".to_string(),
            format!("model_provider={provider}"),
            "--yolo".to_string(),
            "--skip-git-repo-check".to_string(),
            "-m".to_string(),
            self.options.model.clone(),
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

    #[test]
    fn test_unsupported_provider_rejected() {
        let builder = CodexBuilder::new(BuilderOptions {
            model: "gpt-5".into(),
            provider: Some("mystery".into()),
            script_path: "/s/run-agent.sh".into(),
        });
        assert!(matches!(
            builder.build_command("x", None),
            Err(AgentBuildError::UnsupportedProvider { .. })
        ));
    }
}
