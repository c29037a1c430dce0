//! CLI command definitions for agentbench.
//!
//! Three subcommands: `run` executes the full agent-then-verify pipeline,
//! `test` runs verification only against the current workspace state, and
//! `list` prints the tasks a dataset offers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::agents::AgentKind;
use crate::bench::{default_test_command, select_tasks, BenchmarkReport, BenchmarkRunner, TaskSelection};
use crate::config::{BenchPaths, DatasetKind, RunConfig, SandboxKind, BASE_INSTRUCTION, DEFAULT_CONTAINER};
use crate::dataset::{DatasetReader, ExercismDataset, SweLancerDataset};
use crate::executor::{CommandExecutor, ProcessExecutor};
use crate::runner::{AgentPhaseRunner, TaskRunner, TestPhaseRunner};

/// Coding-agent benchmark orchestrator.
#[derive(Parser)]
#[command(name = "agentbench")]
#[command(about = "Run coding agents against benchmark tasks and verify the results")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run agents on tasks and verify each result with the test command.
    Run(RunArgs),

    /// Run only the verification step against the current workspace state.
    Test(TestArgs),

    /// List the tasks a dataset offers.
    List(ListArgs),
}

/// Shared selection and environment flags.
#[derive(Parser, Debug)]
pub struct CommonArgs {
    /// Dataset to draw tasks from (v1 = exercises, v2 = issue repo).
    #[arg(short, long, default_value = "v1")]
    pub dataset: DatasetKind,

    /// Where commands execute (docker or local).
    #[arg(short, long, default_value = "docker")]
    pub sandbox: SandboxKind,

    /// Root directory of the benchmark tree.
    #[arg(long, default_value = ".", env = "AGENTBENCH_ROOT")]
    pub root: PathBuf,

    /// Name of the container image for Docker runs.
    #[arg(long, default_value = DEFAULT_CONTAINER)]
    pub container: String,

    /// Verification command. Defaults depend on dataset and sandbox.
    #[arg(long)]
    pub test_command: Option<String>,
}

/// Arguments for `agentbench run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Agent to run (claude, codex, copilot, kimi).
    #[arg(short, long, default_value = "claude")]
    pub agent: AgentKind,

    /// Model identifier passed to the agent CLI.
    #[arg(short, long)]
    pub model: String,

    /// Provider routing for the agent (e.g. openrouter, moonshot).
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Run one task by name.
    #[arg(short, long, conflicts_with_all = ["tasks", "count"])]
    pub task: Option<String>,

    /// Comma-separated list of tasks to run in order.
    #[arg(long, conflicts_with = "count")]
    pub tasks: Option<String>,

    /// Run the first N tasks of the dataset.
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Per-subprocess timeout in seconds.
    #[arg(long, default_value = "1800")]
    pub timeout: u64,

    /// Extra instruction text appended to the task prompt.
    #[arg(long)]
    pub instruction: Option<String>,

    /// Echo commands, diffs, and output previews.
    #[arg(short, long)]
    pub verbose: bool,

    /// Report workspace file activity while the agent runs.
    #[arg(long)]
    pub progress: bool,

    /// Skip writing the JSON report.
    #[arg(long)]
    pub no_report: bool,
}

/// Arguments for `agentbench test`.
#[derive(Parser, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Task whose workspace to verify.
    #[arg(short, long)]
    pub task: String,

    /// Per-subprocess timeout in seconds.
    #[arg(long, default_value = "1800")]
    pub timeout: u64,

    /// Echo commands and output previews.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for `agentbench list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_benchmark(args).await,
        Commands::Test(args) => run_verification(args).await,
        Commands::List(args) => list_tasks(args).await,
    }
}

fn dataset_for(common: &CommonArgs, paths: &BenchPaths) -> Arc<dyn DatasetReader> {
    match common.dataset {
        DatasetKind::V1 => Arc::new(ExercismDataset::new(&paths.exercism_base)),
        DatasetKind::V2 => Arc::new(SweLancerDataset::new(&paths.manifest, &paths.issues_dir)),
    }
}

fn resolve_test_command(common: &CommonArgs) -> String {
    common
        .test_command
        .clone()
        .unwrap_or_else(|| default_test_command(common.dataset, common.sandbox))
}

async fn run_benchmark(args: RunArgs) -> anyhow::Result<()> {
    let root = args
        .common
        .root
        .canonicalize()
        .with_context(|| format!("benchmark root {} not found", args.common.root.display()))?;
    let paths = BenchPaths::resolve(root);
    let dataset = dataset_for(&args.common, &paths);
    let executor: Arc<dyn CommandExecutor> = Arc::new(ProcessExecutor);

    let config = RunConfig::new(args.agent, args.model)
        .with_dataset(args.common.dataset)
        .with_sandbox(args.common.sandbox)
        .with_provider(args.provider.clone())
        .with_test_command(resolve_test_command(&args.common))
        .with_timeout(Duration::from_secs(args.timeout))
        .with_verbose(args.verbose)
        .with_show_progress(args.progress);

    let selection = if let Some(task) = args.task {
        TaskSelection::Single(task)
    } else if let Some(tasks) = args.tasks {
        TaskSelection::List(tasks.split(',').map(|s| s.trim().to_string()).collect())
    } else if let Some(n) = args.count {
        TaskSelection::Count(n)
    } else {
        TaskSelection::First
    };

    let agent_runner = AgentPhaseRunner::new(
        executor.clone(),
        dataset.clone(),
        paths.clone(),
        &args.common.container,
        BASE_INSTRUCTION,
        args.instruction,
    );
    let test_runner = TestPhaseRunner::new(executor.clone(), paths.clone(), &args.common.container);
    let task_runner = TaskRunner::new(
        executor,
        dataset.clone(),
        agent_runner,
        test_runner,
        paths.clone(),
    );

    let runner = BenchmarkRunner::new(dataset, task_runner);
    let results = runner.run(&config, &selection).await?;

    let report = BenchmarkReport::new(&config, &results);
    report.print_summary();
    if !args.no_report {
        let path = report.export_json(&paths.results_dir)?;
        info!(path = %path.display(), "report written");
    }

    if results.iter().all(|r| r.overall_success) {
        Ok(())
    } else {
        anyhow::bail!("{} task(s) failed", results.iter().filter(|r| !r.overall_success).count())
    }
}

/// Verification-only path: no agent invocation, no workspace reset, no patch
/// application. Tests whatever state the workspace is currently in.
async fn run_verification(args: TestArgs) -> anyhow::Result<()> {
    let root = args
        .common
        .root
        .canonicalize()
        .with_context(|| format!("benchmark root {} not found", args.common.root.display()))?;
    let paths = BenchPaths::resolve(root);
    let dataset = dataset_for(&args.common, &paths);
    let executor: Arc<dyn CommandExecutor> = Arc::new(ProcessExecutor);

    let available = dataset.tasks().await?;
    if !available.contains(&args.task) {
        anyhow::bail!("unknown task '{}'", args.task);
    }

    let config = RunConfig::new(AgentKind::Claude, "none")
        .with_dataset(args.common.dataset)
        .with_sandbox(args.common.sandbox)
        .with_test_command(resolve_test_command(&args.common))
        .with_timeout(Duration::from_secs(args.timeout))
        .with_verbose(args.verbose);

    let workspace = paths.workspace_for(args.common.dataset, &args.task);
    let runner = TestPhaseRunner::new(executor, paths, &args.common.container);
    let result = runner
        .run(&config, &args.task, &workspace, &Default::default())
        .await;

    if result.success {
        println!("{}: pass ({:.1}s)", args.task, result.duration.as_secs_f64());
        Ok(())
    } else {
        println!("{}: FAIL ({:.1}s)", args.task, result.duration.as_secs_f64());
        if let Some(error) = &result.error {
            eprintln!("{error}");
        }
        anyhow::bail!("verification failed for '{}'", args.task)
    }
}

async fn list_tasks(args: ListArgs) -> anyhow::Result<()> {
    let root = args
        .common
        .root
        .canonicalize()
        .with_context(|| format!("benchmark root {} not found", args.common.root.display()))?;
    let paths = BenchPaths::resolve(root);
    let dataset = dataset_for(&args.common, &paths);

    let tasks = select_tasks(&*dataset, &TaskSelection::Count(usize::MAX)).await?;
    for task in tasks {
        println!("{task}");
    }
    Ok(())
}
