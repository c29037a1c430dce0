//! GitHub Copilot CLI builder.

use std::collections::BTreeMap;

use crate::dataset::TaskFiles;
use crate::exec::Command;

use super::{AgentBuildError, AgentBuilder, BuilderOptions};

pub struct CopilotBuilder {
    options: BuilderOptions,
}

impl CopilotBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self { options }
    }
}

impl AgentBuilder for CopilotBuilder {
    fn build_command(
        &self,
        instructions: &str,
        _file_list: Option<&TaskFiles>,
    ) -> Result<Command, AgentBuildError> {
        let mut env = BTreeMap::new();
        env.insert("COPILOT_ALLOW_ALL".to_string(), "1".to_string());
        if !self.options.model.is_empty() {
            env.insert("COPILOT_MODEL".to_string(), self.options.model.clone());
        }

        let args = vec![
            "bash".to_string(),
            self.options.script_path.clone(),
            "copilot".to_string(),
            "--allow-all-tools".to_string(),
            "--no-color".to_string(),
            "--add-dir".to_string(),
            ".".to_string(),
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
    fn test_allow_all_env_and_model() {
        let cmd = CopilotBuilder::new(BuilderOptions {
            model: "gpt-5".into(),
            provider: None,
            script_path: "/s/run-agent.sh".into(),
        })
        .build_command("do it", None)
        .unwrap();
        assert_eq!(cmd.env.get("COPILOT_ALLOW_ALL").map(String::as_str), Some("1"));
        assert_eq!(cmd.env.get("COPILOT_MODEL").map(String::as_str), Some("gpt-5"));
        assert!(cmd.args.contains(&"--allow-all-tools".to_string()));
    }
}
