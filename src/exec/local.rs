//! Local execution strategy.
//!
//! v1 runs the core command untouched inside the task directory. v2 wraps it
//! in a shell chain that resets the shared checkout, replays patches, and
//! captures the resulting diff without masking the command's exit status.

use crate::config::{BenchPaths, DatasetKind};
use crate::executor::ExecOptions;

use super::script::{compile, ShellStep};
use super::{Command, ExecutionStrategy, PrepareContext, PreparedCommand};

/// Runs prepared commands as plain host processes.
pub struct LocalStrategy {
    repo_checkout: std::path::PathBuf,
}

impl LocalStrategy {
    pub fn new(paths: &BenchPaths) -> Self {
        Self {
            repo_checkout: paths.repo_checkout.clone(),
        }
    }
}

impl ExecutionStrategy for LocalStrategy {
    fn prepare(&self, core: &Command, ctx: &PrepareContext) -> PreparedCommand {
        match ctx.dataset {
            DatasetKind::V1 => PreparedCommand {
                command: core.args.clone(),
                options: ExecOptions {
                    cwd: Some(ctx.workspace.clone()),
                    env: core.env.clone(),
                    timeout: None,
                },
            },
            DatasetKind::V2 => {
                let mut steps = Vec::new();
                if let Some(commit) = &ctx.commit_id {
                    steps.push(ShellStep::ResetToCommit(commit.clone()));
                }
                if let Some(patch) = &ctx.apply_patch {
                    steps.push(ShellStep::ApplyPatch(patch.clone()));
                }
                steps.push(ShellStep::ExecArgv(core.args.clone()));
                if let Some(patch) = &ctx.generate_patch {
                    steps.push(ShellStep::CaptureDiffPreservingExitCode(patch.clone()));
                }

                PreparedCommand {
                    command: vec!["bash".to_string(), "-c".to_string(), compile(&steps)],
                    options: ExecOptions {
                        cwd: Some(self.repo_checkout.clone()),
                        env: core.env.clone(),
                        timeout: None,
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strategy() -> LocalStrategy {
        let mut paths = BenchPaths::resolve("/bench");
        paths.repo_checkout = PathBuf::from("/checkouts/app");
        LocalStrategy::new(&paths)
    }

    #[test]
    fn test_v1_passthrough() {
        let core = Command::new(vec!["corepack".into(), "yarn".into()]).with_env("K", "v");
        let ctx = PrepareContext::new("/abs/acronym", DatasetKind::V1);
        let prepared = strategy().prepare(&core, &ctx);

        assert_eq!(prepared.command, core.args);
        assert_eq!(prepared.options.cwd, Some(PathBuf::from("/abs/acronym")));
        assert_eq!(prepared.options.env, core.env);
    }

    #[test]
    fn test_v2_reset_clause_iff_commit_id() {
        let core = Command::new(vec!["npm".into(), "test".into()]);

        let mut ctx = PrepareContext::new("/checkouts/app", DatasetKind::V2);
        ctx.commit_id = Some("deadbeef".into());
        let with_commit = strategy().prepare(&core, &ctx);
        assert!(with_commit.command[2].contains("git reset --hard deadbeef && "));

        ctx.commit_id = None;
        let without_commit = strategy().prepare(&core, &ctx);
        assert!(!without_commit.command[2].contains("git reset"));
    }

    #[test]
    fn test_v2_shell_wrapping_and_cwd() {
        let core = Command::new(vec![
            "bash".into(),
            "-c".into(),
            "npm rebuild canvas && npm test -- -o".into(),
        ]);
        let mut ctx = PrepareContext::new("/checkouts/app", DatasetKind::V2);
        ctx.generate_patch = Some(PathBuf::from("/bench/.patches/123.patch"));
        let prepared = strategy().prepare(&core, &ctx);

        assert_eq!(prepared.command[0], "bash");
        assert_eq!(prepared.command[1], "-c");
        // Whitespace-bearing tokens are quoted when inlined.
        assert!(prepared.command[2].contains("bash -c \"npm rebuild canvas && npm test -- -o\""));
        assert!(prepared.command[2].ends_with("; RES=$?; git diff > /bench/.patches/123.patch; exit $RES"));
        assert_eq!(prepared.options.cwd, Some(PathBuf::from("/checkouts/app")));
    }

    #[test]
    fn test_v2_apply_patch_clause() {
        let core = Command::new(vec!["true".into()]);
        let mut ctx = PrepareContext::new("/checkouts/app", DatasetKind::V2);
        ctx.apply_patch = Some(PathBuf::from("/issues/1/bug.patch"));
        let prepared = strategy().prepare(&core, &ctx);
        assert!(prepared.command[2].starts_with("git apply /issues/1/bug.patch && "));
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let core = Command::new(vec!["x".into()]).with_env("A", "1").with_env("B", "2");

        let mut contexts = Vec::new();
        for dataset in [DatasetKind::V1, DatasetKind::V2] {
            for commit in [None, Some("c0ffee".to_string())] {
                for patch in [None, Some(PathBuf::from("/bench/.patches/7.patch"))] {
                    let mut ctx = PrepareContext::new("/checkouts/app", dataset);
                    ctx.commit_id = commit.clone();
                    ctx.apply_patch = patch.clone();
                    ctx.generate_patch = patch.clone();
                    contexts.push(ctx);
                }
            }
        }
        let s = strategy();
        for ctx in &contexts {
            assert_eq!(s.prepare(&core, ctx), s.prepare(&core, ctx));
        }
        let prepared: Vec<_> = contexts.iter().map(|c| s.prepare(&core, c)).collect();
        assert!(prepared.windows(2).any(|w| w[0] != w[1]));
    }
}
