//! Benchmark Executor
//!
//! Runs every planned (test, variant) pair and turns the samples into a
//! run summary.
//!
//! ## Pipeline Overview
//!
//! ```text
//! RunPlan (from planner)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Build, run iterations, collect RawSamples
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  analysis   │  Per-test statistics, winners, rankings (parallel)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  metadata   │  Run identifier, host and tool information
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Sequential execution of the plan
//! - [`analysis`] - Statistical compilation of samples
//! - [`metadata`] - Run and system metadata
//! - [`formatting`] - Human-readable output formatting

mod analysis;
mod execution;
mod formatting;
mod metadata;

// Re-export public API
pub use analysis::{reliability_score, CompiledResults, ScoreWeights, StatisticalCompiler};
pub use execution::{ExecutionConfig, RunCoordinator};
pub use formatting::format_human_output;
pub use metadata::{benchmark_id, build_run_meta, system_info};
