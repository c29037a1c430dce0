//! Benchmark batch execution and reporting.

pub mod reporter;
pub mod runner;

pub use reporter::BenchmarkReport;
pub use runner::{default_test_command, select_tasks, BenchError, BenchmarkRunner, TaskSelection};
