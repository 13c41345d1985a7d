#![warn(missing_docs)]
//! # Polybench
//!
//! Cross-language performance benchmarking: the same test written in several
//! languages is built where needed, run repeatedly under a deadline, and
//! compared on time, memory and reliability.
//!
//! - **Variants**: interpreted programs run straight from source; compiled
//!   ones are built once in a throwaway project with inferred dependencies
//! - **Isolation**: every iteration is its own process with a timeout that
//!   also reaches grandchildren
//! - **Resource sampling**: peak resident memory and average CPU per iteration
//! - **Statistics**: per-test summaries, composite scores, winners,
//!   approximate pairwise significance and cross-test rankings
//!
//! ## Quick Start
//!
//! ```text
//! polybench init        # write polybench.toml
//! polybench validate    # check toolchains
//! polybench list        # show the plan
//! polybench --format json -o results.json
//! ```
//!
//! ## Library Use
//!
//! ```ignore
//! use polybench::{run_suite, BenchConfig, PlanFilter};
//!
//! let config = BenchConfig::load("polybench.toml")?;
//! let summary = run_suite(&config, &PlanFilter::default(), false)?;
//! println!("{:?}", summary.overall.by_overall);
//! ```

// Re-export sample model
pub use polybench_core::{push_sample, FailureKind, RawSample, SampleOutcome, SampleSet};

// Re-export stats
pub use polybench_stats::{compute_summary, p_value_or_default, welch_t_test, SummaryStatistics};

// Re-export report types
pub use polybench_report::{
    generate_json_report, OutputFormat, OverallRanking, RankedVariant, RunMeta, RunSummary,
    RunTotals, TestAnalysis, VariantPerformance,
};

// Re-export the run pipeline
pub use polybench_cli::{
    build_plan, run, run_suite, run_with_cli, BenchConfig, BuildScaffolder, Cli,
    EnvironmentValidator, PlanFilter, ResourceMonitor, RunCoordinator, RunPlan,
    StatisticalCompiler, Toolchain, VariantRunner,
};
