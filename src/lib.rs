//! agentbench: Coding-agent benchmark orchestrator.
//!
//! This library runs autonomous coding agents against benchmark tasks and
//! verifies the results with each task's test command, in Docker containers
//! or directly on the host.

// Core modules
pub mod agents;
pub mod bench;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod exec;
pub mod executor;
pub mod logs;
pub mod runner;
pub mod workspace;

// Re-export the types most callers need
pub use config::{BenchPaths, DatasetKind, RunConfig, SandboxKind};
pub use executor::{CommandExecutor, ExecError, ProcessExecutor};
pub use runner::{PhaseResult, TaskResult};
