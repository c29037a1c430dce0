//! Typed shell-step sequencing.
//!
//! The v2 strategies chain setup, patch handling, the core command and diff
//! capture into one `bash -c` string. Modeling the chain as typed steps keeps
//! the sequencing testable without invoking a shell; the string form only
//! exists at the strategy's output boundary.

use std::path::PathBuf;

/// One step of a composed shell invocation, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellStep {
    /// Raw setup snippet; must succeed for later steps to run.
    Setup(String),
    /// Hard-reset the checkout to a commit; must succeed.
    ResetToCommit(String),
    /// Apply a patch unconditionally; must succeed.
    ApplyPatch(PathBuf),
    /// Apply a patch only if the file exists and is non-empty. An absent or
    /// zero-byte patch is a normal no-op, never an error.
    ConditionalApplyPatch(PathBuf),
    /// Run an inline argument vector (quoted as needed).
    ExecArgv(Vec<String>),
    /// Run the trailing `-- argv` via `exec "$@"`, preserving its exit code.
    ExecPassthrough,
    /// Capture `git diff` to a file after the command, then re-raise the
    /// command's original exit status.
    CaptureDiffPreservingExitCode(PathBuf),
}

/// Compiles an ordered step list into a single shell string.
pub fn compile(steps: &[ShellStep]) -> String {
    let mut script = String::new();
    for step in steps {
        match step {
            ShellStep::Setup(snippet) => {
                script.push_str(snippet);
                script.push_str(" && ");
            }
            ShellStep::ResetToCommit(commit) => {
                script.push_str(&format!("git reset --hard {commit} && "));
            }
            ShellStep::ApplyPatch(path) => {
                script.push_str(&format!("git apply {} && ", path.display()));
            }
            ShellStep::ConditionalApplyPatch(path) => {
                let p = path.display();
                script.push_str(&format!("if [ -s {p} ]; then git apply {p}; fi; "));
            }
            ShellStep::ExecArgv(args) => {
                script.push_str(&quote_args(args));
            }
            ShellStep::ExecPassthrough => {
                script.push_str("(exec \"$@\")");
            }
            ShellStep::CaptureDiffPreservingExitCode(path) => {
                script.push_str(&format!(
                    "; RES=$?; git diff > {}; exit $RES",
                    path.display()
                ));
            }
        }
    }
    script
}

/// Joins an argument vector for embedding in a shell string, wrapping tokens
/// that contain whitespace.
fn quote_args(args: &[String]) -> String {
    args.iter()
        .map(|a| {
            if a.chars().any(char::is_whitespace) {
                format!("\"{a}\"")
            } else {
                a.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    #[test]
    fn test_reset_and_apply_fragments() {
        let script = compile(&[
            ShellStep::ResetToCommit("abc123".into()),
            ShellStep::ApplyPatch(PathBuf::from("/p/fix.patch")),
            ShellStep::ExecArgv(vec!["npm".into(), "test".into()]),
        ]);
        assert_eq!(
            script,
            "git reset --hard abc123 && git apply /p/fix.patch && npm test"
        );
    }

    #[test]
    fn test_conditional_apply_guard() {
        let script = compile(&[ShellStep::ConditionalApplyPatch(PathBuf::from(
            "/patches/x.patch",
        ))]);
        assert_eq!(
            script,
            "if [ -s /patches/x.patch ]; then git apply /patches/x.patch; fi; "
        );
    }

    #[test]
    fn test_passthrough_and_diff_capture() {
        let script = compile(&[
            ShellStep::ExecPassthrough,
            ShellStep::CaptureDiffPreservingExitCode(PathBuf::from("/patches/out.patch")),
        ]);
        assert_eq!(
            script,
            "(exec \"$@\"); RES=$?; git diff > /patches/out.patch; exit $RES"
        );
    }

    #[test]
    fn test_whitespace_tokens_quoted() {
        let script = compile(&[ShellStep::ExecArgv(vec![
            "echo".into(),
            "two words".into(),
        ])]);
        assert_eq!(script, "echo \"two words\"");
    }

    #[test]
    fn test_diff_capture_preserves_exit_code() {
        // The wrapped command exits 7; the diff step must not mask it.
        let dir = tempfile::tempdir().unwrap();
        let patch = dir.path().join("out.patch");
        let script = compile(&[
            ShellStep::ExecArgv(vec!["sh".into(), "-c".into(), "exit 7".into()]),
            ShellStep::CaptureDiffPreservingExitCode(patch.clone()),
        ]);

        let status = StdCommand::new("bash")
            .arg("-c")
            .arg(&script)
            .current_dir(dir.path())
            .output()
            .unwrap();
        assert_eq!(status.status.code(), Some(7));
        // The diff file is created even when the command failed.
        assert!(patch.exists());
    }

    #[test]
    fn test_conditional_apply_skips_empty_patch() {
        // Zero-byte patch: the guard must not invoke `git apply` at all, so
        // the script succeeds even outside a git repository.
        let dir = tempfile::tempdir().unwrap();
        let patch = dir.path().join("empty.patch");
        std::fs::write(&patch, "").unwrap();

        let script = format!(
            "{}true",
            compile(&[ShellStep::ConditionalApplyPatch(patch)])
        );
        let out = StdCommand::new("bash")
            .arg("-c")
            .arg(&script)
            .current_dir(dir.path())
            .output()
            .unwrap();
        assert_eq!(out.status.code(), Some(0));
        assert!(out.stderr.is_empty());
    }
}
