//! Containerized execution strategy.
//!
//! Every phase runs as a one-shot `docker run --rm`, so no container state
//! survives between phases or tasks.

use std::collections::BTreeMap;
use std::fs;

use crate::config::{
    BenchPaths, DatasetKind, CLI_CACHE_MOUNT, HOST_TREE_MOUNT, ISSUES_MOUNT, NPM_CACHE_MOUNT,
    PATCHES_MOUNT, REPO_WORKDIR, SESSION_MOUNT, WORKSPACE_MOUNT,
};
use crate::executor::ExecOptions;

use super::script::{compile, ShellStep};
use super::{Command, ExecutionStrategy, PrepareContext, PreparedCommand};

pub(crate) const DOCKER_BASE_ARGS: [&str; 4] = ["docker", "run", "--rm", "-i"];

/// Variables that may be forwarded with an empty value. Forwarding them empty
/// deliberately unsets inherited package-manager prefixes inside the
/// container; every other empty variable is dropped so unset host secrets
/// never leak through.
const ALLOW_EMPTY_ENV: [&str; 3] = ["NPM_CONFIG_PREFIX", "npm_config_prefix", "NPM_PREFIX"];

/// Runs prepared commands inside one-shot containers.
pub struct DockerStrategy {
    container_name: String,
    paths: BenchPaths,
}

impl DockerStrategy {
    pub fn new(container_name: impl Into<String>, paths: &BenchPaths) -> Self {
        Self {
            container_name: container_name.into(),
            paths: paths.clone(),
        }
    }

    /// `-e KEY=VALUE` pairs for all forwardable variables.
    fn environment_args(env: &BTreeMap<String, String>) -> Vec<String> {
        env.iter()
            .filter(|(key, value)| !value.is_empty() || ALLOW_EMPTY_ENV.contains(&key.as_str()))
            .flat_map(|(key, value)| ["-e".to_string(), format!("{key}={value}")])
            .collect()
    }

    fn cli_cache_args(&self) -> Vec<String> {
        // Cache directory creation is the one side effect prepare() may have.
        let _ = fs::create_dir_all(&self.paths.cli_cache_dir);
        vec![
            "-v".to_string(),
            format!("{}:{CLI_CACHE_MOUNT}", self.paths.cli_cache_dir.display()),
        ]
    }

    fn npm_cache_args(&self) -> Vec<String> {
        let _ = fs::create_dir_all(&self.paths.npm_cache_dir);
        vec![
            "-v".to_string(),
            format!("{}:{NPM_CACHE_MOUNT}", self.paths.npm_cache_dir.display()),
        ]
    }

    /// Environment bootstrap for the v2 monolith. Rewrites the setup playbook
    /// so inherited npm prefixes are unset before nvm loads, runs it, then
    /// commits a baseline so the agent's edits are diffable afterwards.
    fn v2_setup_snippet(issue_id: &str) -> String {
        format!(
            "export ISSUE_ID={issue_id} && export CI=true && export NPM_CONFIG_YES=true && \
             sed 's|source /root/.nvm/nvm.sh|unset NPM_CONFIG_PREFIX npm_config_prefix NPM_PREFIX; source /root/.nvm/nvm.sh|g' \
             /app/tests/setup_repo.yml > /tmp/setup_repo_unset.yml && \
             ansible-playbook -i \"localhost,\" --connection=local /tmp/setup_repo_unset.yml && \
             git add -A && git -c user.email=agentbench@local -c user.name=agentbench \
             commit -m \"setup baseline\" --no-gpg-sign --allow-empty"
        )
    }

    fn prepare_v2(&self, core: &Command, ctx: &PrepareContext) -> PreparedCommand {
        let issue_id = ctx
            .issue_id
            .clone()
            .or_else(|| {
                ctx.workspace
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
            })
            .unwrap_or_default();

        let mut steps = vec![ShellStep::Setup(Self::v2_setup_snippet(&issue_id))];
        if let Some(patch) = &ctx.apply_patch {
            steps.push(ShellStep::ConditionalApplyPatch(patch.clone()));
        }
        steps.push(ShellStep::ExecPassthrough);
        if let Some(patch) = &ctx.generate_patch {
            steps.push(ShellStep::CaptureDiffPreservingExitCode(patch.clone()));
        }
        let shell = compile(&steps);

        let mut env = core.env.clone();
        env.insert("NPM_CONFIG_CACHE".to_string(), NPM_CACHE_MOUNT.to_string());

        let mut command: Vec<String> = DOCKER_BASE_ARGS.iter().map(|s| s.to_string()).collect();
        command.extend(["--entrypoint".to_string(), "/usr/bin/env".to_string()]);
        command.extend(self.cli_cache_args());
        command.extend(Self::environment_args(&env));
        command.extend(["--platform".to_string(), "linux/amd64".to_string()]);
        command.extend([
            "-v".to_string(),
            format!("{}:{HOST_TREE_MOUNT}:ro", self.paths.host_root.display()),
            "-v".to_string(),
            format!("{}:{SESSION_MOUNT}", self.paths.session_dir.display()),
        ]);
        command.extend(self.npm_cache_args());
        command.extend([
            "-v".to_string(),
            format!("{}:{PATCHES_MOUNT}", self.paths.patches_dir.display()),
            "-v".to_string(),
            format!("{}:{ISSUES_MOUNT}:ro", self.paths.issues_dir.display()),
            "-w".to_string(),
            REPO_WORKDIR.to_string(),
        ]);
        command.push(self.container_name.clone());
        command.extend(["bash".to_string(), "-c".to_string(), shell, "--".to_string()]);
        command.extend(core.args.iter().cloned());

        PreparedCommand {
            command,
            options: ExecOptions::default(),
        }
    }

    fn prepare_v1(&self, core: &Command, ctx: &PrepareContext) -> PreparedCommand {
        let workspace = ctx.workspace.display().to_string();

        // One read-only bind per test file, so the agent cannot rewrite
        // verification files even if it replaces the whole workspace.
        let test_mounts: Vec<String> = ctx
            .test_files
            .iter()
            .flat_map(|file| {
                [
                    "-v".to_string(),
                    format!("{workspace}/{file}:{WORKSPACE_MOUNT}/{file}:ro"),
                ]
            })
            .collect();

        let mut command: Vec<String> = DOCKER_BASE_ARGS.iter().map(|s| s.to_string()).collect();
        command.extend(self.cli_cache_args());
        command.extend(Self::environment_args(&core.env));
        command.extend([
            "-v".to_string(),
            format!("{workspace}:{WORKSPACE_MOUNT}"),
            "-w".to_string(),
            WORKSPACE_MOUNT.to_string(),
        ]);
        command.extend(test_mounts);
        command.push(self.container_name.clone());
        command.extend(core.args.iter().cloned());

        PreparedCommand {
            command,
            options: ExecOptions::default(),
        }
    }
}

impl ExecutionStrategy for DockerStrategy {
    fn prepare(&self, core: &Command, ctx: &PrepareContext) -> PreparedCommand {
        match ctx.dataset {
            DatasetKind::V2 => self.prepare_v2(core, ctx),
            DatasetKind::V1 => self.prepare_v1(core, ctx),
        }
    }
}
