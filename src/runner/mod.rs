//! Task execution pipeline: agent phase, verification phase, and the
//! orchestration that ties them together per task.

pub mod agent;
pub mod progress;
pub mod result;
pub mod task;
pub mod test;

pub use agent::AgentPhaseRunner;
pub use progress::ProgressMonitor;
pub use result::{PhaseResult, TaskResult};
pub use task::TaskRunner;
pub use test::{TestContext, TestPhaseRunner};
