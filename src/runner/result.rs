//! Phase and task results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of one pipeline phase (agent invocation or test verification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub success: bool,
    pub duration: Duration,
    /// Captured stdout of the phase.
    pub output: String,
    /// Diagnostic text when the phase failed.
    pub error: Option<String>,
}

impl PhaseResult {
    pub fn success(duration: Duration, output: impl Into<String>) -> Self {
        Self {
            success: true,
            duration,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(duration: Duration, error: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            success: false,
            duration,
            output: output.into(),
            error: Some(error.into()),
        }
    }
}

/// Aggregated outcome of one task iteration. Both phase results are always
/// present: the test phase records ground truth even when the agent phase
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: String,
    pub agent: PhaseResult,
    pub test: PhaseResult,
    pub overall_success: bool,
    pub total_duration: Duration,
}

impl TaskResult {
    pub fn new(
        task: impl Into<String>,
        agent: PhaseResult,
        test: PhaseResult,
        total_duration: Duration,
    ) -> Self {
        let overall_success = agent.success && test.success;
        Self {
            task: task.into(),
            agent,
            test,
            overall_success,
            total_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_requires_both_phases() {
        let ok = PhaseResult::success(Duration::from_secs(1), "");
        let bad = PhaseResult::failure(Duration::from_secs(1), "boom", "");

        assert!(TaskResult::new("t", ok.clone(), ok.clone(), Duration::ZERO).overall_success);
        assert!(!TaskResult::new("t", bad.clone(), ok.clone(), Duration::ZERO).overall_success);
        assert!(!TaskResult::new("t", ok, bad.clone(), Duration::ZERO).overall_success);

        // Both phase results are recorded even when the agent failed.
        let result = TaskResult::new(
            "t",
            bad,
            PhaseResult::success(Duration::from_secs(2), "tests green"),
            Duration::ZERO,
        );
        assert!(result.test.success);
        assert!(!result.overall_success);
    }
}
