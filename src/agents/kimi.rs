//! Kimi CLI builder (Moonshot).

use std::collections::BTreeMap;

use serde_json::json;

use crate::dataset::TaskFiles;
use crate::exec::Command;

use super::{require_env, AgentBuildError, AgentBuilder, BuilderOptions};

pub struct KimiBuilder {
    options: BuilderOptions,
}

impl KimiBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self { options }
    }
}

impl AgentBuilder for KimiBuilder {
    fn build_command(
        &self,
        instructions: &str,
        _file_list: Option<&TaskFiles>,
    ) -> Result<Command, AgentBuildError> {
        let provider = self.options.provider.as_deref().unwrap_or("moonshot");
        if provider != "moonshot" {
            return Err(AgentBuildError::UnsupportedProvider {
                agent: "Kimi",
                provider: provider.to_string(),
            });
        }

        let mut env = BTreeMap::new();
        env.insert(
            "KIMI_API_KEY".to_string(),
            require_env("Kimi", provider, "KIMI_API_KEY")?,
        );

        let model = &self.options.model;
        let base_url = std::env::var("KIMI_BASE_URL")
            .unwrap_or_else(|_| "https://api.moonshot.ai/v1".to_string());
        let config = json!({
            "default_model": model,
            "providers": {
                "moonshot": { "type": "kimi", "base_url": base_url, "api_key": "env" }
            },
            "models": {
                model: { "provider": "moonshot", "model": model, "max_context_size": 262144 }
            }
        });

        let args = vec![
            "bash".to_string(),
            self.options.script_path.clone(),
            "kimi".to_string(),
            "--print".to_string(),
            "--output-format".to_string(),
            "text".to_string(),
            "--config".to_string(),
            config.to_string(),
            "--model".to_string(),
            model.clone(),
            "-p".to_string(),
            instructions.to_string(),
        ];

        Ok(Command { args, env })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_moonshot_provider_rejected() {
        let builder = KimiBuilder::new(BuilderOptions {
            model: "kimi-k2".into(),
            provider: Some("openrouter".into()),
            script_path: "/s/run-agent.sh".into(),
        });
        assert!(matches!(
            builder.build_command("x", None),
            Err(AgentBuildError::UnsupportedProvider { .. })
        ));
    }
}
