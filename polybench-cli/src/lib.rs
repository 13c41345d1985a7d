//! Polybench CLI Library
//!
//! Command-line front end and run pipeline for polybench. Use
//! `polybench::run()` (or `polybench_cli::run()`) in a main function to get
//! the full CLI, or [`run_suite`] to drive a run programmatically.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     polybench_cli::run()
//! }
//! ```

mod config;
mod executor;
mod planner;
mod runner;
mod scaffold;
mod supervisor;
mod validation;

pub use config::*;
pub use executor::{
    benchmark_id, build_run_meta, format_human_output, reliability_score, system_info,
    CompiledResults, ExecutionConfig, RunCoordinator, ScoreWeights, StatisticalCompiler,
};
pub use planner::{
    build_plan, find_test_dir, PlanError, PlanFilter, PlannedTest, RunPlan, INPUT_FILE_NAME,
    KNOWN_CATEGORIES,
};
pub use runner::{CompiledRunner, InterpretedRunner, PrepareError, PreparedProgram, VariantRunner};
pub use scaffold::{
    infer_dependencies, infer_go_imports, render_cargo_manifest, render_go_module,
    BuildArtifact, BuildScaffolder, Dependency, ScaffoldError, Toolchain, SCAFFOLD_PACKAGE,
};
pub use supervisor::{describe_command, Completion, MonitorError, ResourceMonitor, Supervised};
pub use validation::{
    check_network, find_executable, is_executable, EnvironmentValidator, ValidationIssue,
    VariantStatus,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use polybench_report::{generate_json_report, OutputFormat, RunSummary};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long the network probe may take before network suites are flagged
const NETWORK_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Polybench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "polybench")]
#[command(author, version, about = "Polybench - cross-language performance benchmarks")]
pub struct Cli {
    /// Optional subcommand (Run, List, Validate, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (discovered from the current directory if omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Filter tests by regex pattern
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Only run these variants (comma separated)
    #[arg(long, value_delimiter = ',', global = true)]
    pub variants: Vec<String>,

    /// Only run these tests (comma separated)
    #[arg(long, value_delimiter = ',', global = true)]
    pub tests: Vec<String>,

    /// Iterations per test and variant (overrides configuration)
    #[arg(short = 'n', long, global = true)]
    pub iterations: Option<u32>,

    /// Output format: human, json
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run benchmarks (default)
    Run,
    /// List the tests and variants a run would cover
    List,
    /// Check that every variant's toolchain is installed
    Validate,
    /// Write a starter polybench.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the Polybench CLI with process arguments
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Polybench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Logs go to stderr so JSON on stdout stays parseable
    let filter = if cli.verbose {
        "polybench=debug"
    } else {
        "polybench=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Init { force }) = cli.command {
        return init_config(cli.config.as_deref(), force);
    }

    let config = load_config(cli.config.as_deref())?;
    let filter = plan_filter(&cli)?;

    match cli.command {
        Some(Commands::List) => list_plan(&config, &filter),
        Some(Commands::Validate) => validate_environment(&config),
        Some(Commands::Run) | None => run_benchmarks(&cli, &config, &filter),
        Some(Commands::Init { .. }) => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BenchConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => BenchConfig::discover_path().ok_or_else(|| {
            anyhow::anyhow!(
                "No {} found; run `polybench init` to create one",
                CONFIG_FILE_NAME
            )
        })?,
    };
    let config = BenchConfig::load(&path)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

fn plan_filter(cli: &Cli) -> anyhow::Result<PlanFilter> {
    let pattern = cli
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid --filter pattern")?;
    Ok(PlanFilter {
        pattern,
        tests: cli.tests.clone(),
        variants: cli.variants.clone(),
        iterations: cli.iterations,
    })
}

fn init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(&path, BenchConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

fn list_plan(config: &BenchConfig, filter: &PlanFilter) -> anyhow::Result<()> {
    let plan = build_plan(config, filter)?;

    println!("Polybench Plan:");
    for test in &plan.tests {
        let network = if test.requires_network { " [network]" } else { "" };
        println!("├── {}{} ({} iterations)", test.name, network, test.iterations);
        for (variant, source) in &test.sources {
            println!("│   ├── {}: {}", variant, source.display());
        }
        if let Some(input) = &test.input {
            println!("│   └── input: {}", input.display());
        }
    }
    println!(
        "{} tests, {} variants, {} executions.",
        plan.tests.len(),
        plan.variants.len(),
        plan.total_executions()
    );
    Ok(())
}

fn validate_environment(config: &BenchConfig) -> anyhow::Result<()> {
    let mut validator = EnvironmentValidator::new(config.variants.clone());
    let report = validator.validation_report();

    println!("Environment:");
    for status in &report {
        match (&status.issue, &status.version) {
            (None, Some(version)) => println!("  ✓ {:<12} {} ({})", status.name, status.kind, version),
            (None, None) => println!("  ✓ {:<12} {} (version unknown)", status.name, status.kind),
            (Some(issue), _) => println!("  ✗ {:<12} {}", status.name, issue),
        }
    }

    let unavailable = report.iter().filter(|s| !s.is_available()).count();
    if unavailable > 0 {
        anyhow::bail!("{} of {} variants unavailable", unavailable, report.len());
    }
    Ok(())
}

/// Run the planned benchmarks end to end and return the summary
pub fn run_suite(
    config: &BenchConfig,
    filter: &PlanFilter,
    show_progress: bool,
) -> anyhow::Result<RunSummary> {
    let started = Instant::now();
    let id = benchmark_id(chrono::Local::now());
    info!("Benchmark ID: {}", id);

    let plan = build_plan(config, filter)?;

    let mut validator = EnvironmentValidator::new(
        config
            .variants
            .iter()
            .filter(|(name, _)| plan.variants.contains(name))
            .map(|(name, variant)| (name.clone(), variant.clone()))
            .collect(),
    );
    let unavailable: BTreeMap<String, String> = validator
        .validation_report()
        .into_iter()
        .filter_map(|status| status.issue.map(|issue| (status.name, issue.to_string())))
        .collect();
    let tool_versions = validator.tool_versions();

    if plan.requires_network() && !check_network(NETWORK_PROBE_TIMEOUT) {
        warn!("Network appears unreachable; network tests will likely fail");
    }

    let scratch_root = config
        .system
        .scratch_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let runners = plan
        .variants
        .iter()
        .filter_map(|name| {
            config.variants.get(name).map(|variant| {
                (
                    name.clone(),
                    VariantRunner::from_config(
                        name,
                        variant,
                        &scratch_root,
                        &config.system.binaries_dir,
                    ),
                )
            })
        })
        .collect();

    let mut coordinator = RunCoordinator::new(
        runners,
        ExecutionConfig {
            sampling_interval: config.sampling_interval(),
            monitor_resources: config.system.monitor_resources,
            show_progress,
        },
    );
    for (variant, reason) in unavailable {
        coordinator.mark_unavailable(variant, reason);
    }

    info!(
        "Executing {} tests across {} variants ({} executions)",
        plan.tests.len(),
        plan.variants.len(),
        plan.total_executions()
    );
    let samples = coordinator.execute(&plan);

    let compiled = StatisticalCompiler::default().compile(&samples);
    let meta = build_run_meta(id, &plan, started.elapsed(), tool_versions);
    info!("Benchmark suite completed in {:.2}s", meta.total_duration_secs);

    if config.system.cleanup_binaries {
        cleanup_binaries(&config.system.binaries_dir);
    }

    Ok(RunSummary {
        meta,
        tests: compiled.tests,
        overall: compiled.overall,
        totals: compiled.totals,
    })
}

fn run_benchmarks(cli: &Cli, config: &BenchConfig, filter: &PlanFilter) -> anyhow::Result<()> {
    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(config.output.format.as_str())
        .parse()
        .unwrap_or(OutputFormat::Human);

    let summary = run_suite(config, filter, !cli.no_progress)?;

    if config.output.save_json {
        let path = save_json_summary(&summary, Path::new(&config.output.directory))?;
        info!("Results saved to {}", path.display());
    }

    let output = match format {
        OutputFormat::Json => generate_json_report(&summary)?,
        OutputFormat::Human => format_human_output(&summary),
    };

    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)?;
        file.write_all(output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    Ok(())
}

/// Write `summary` as `<directory>/<benchmark_id>.json`
pub fn save_json_summary(summary: &RunSummary, directory: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create {}", directory.display()))?;
    let path = directory.join(format!("{}.json", summary.meta.benchmark_id));
    std::fs::write(&path, generate_json_report(summary)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Remove built artifacts
pub fn cleanup_binaries(binaries_dir: &Path) {
    if !binaries_dir.exists() {
        return;
    }
    match std::fs::remove_dir_all(binaries_dir) {
        Ok(()) => info!("Removed {}", binaries_dir.display()),
        Err(e) => warn!("Failed to remove {}: {}", binaries_dir.display(), e),
    }
}
