//! Run Coordinator
//!
//! Walks the plan sequentially: every test, every variant with a source for
//! it, every iteration. Nothing runs concurrently so measurements do not
//! contend for the machine.
//!
//! ## Data Flow
//!
//! ```text
//! RunPlan (tests × variants)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │  VariantRunner   │  prepare once per (test, variant)
//! └────────┬─────────┘
//!          │  run × iterations
//!          ▼
//! ┌──────────────────┐
//! │ ResourceMonitor  │  deadline + memory/CPU sampling
//! └────────┬─────────┘
//!          ▼
//!   SampleSet (test → variant → RawSample*)
//! ```
//!
//! Failure policy:
//! - a missing toolchain fails every remaining iteration of that variant,
//!   for this test and all later ones, and is logged once
//! - a build failure fails every iteration of that (test, variant) pair
//! - anything else fails only the iteration it happened in

use crate::planner::{PlannedTest, RunPlan};
use crate::runner::{PrepareError, VariantRunner};
use crate::supervisor::ResourceMonitor;
use indicatif::{ProgressBar, ProgressStyle};
use polybench_core::{push_sample, FailureKind, RawSample, SampleOutcome, SampleSet};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings shared by every execution of a run
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Interval between resource samples
    pub sampling_interval: Duration,
    /// Sample CPU and memory while programs run
    pub monitor_resources: bool,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            sampling_interval: Duration::from_millis(100),
            monitor_resources: true,
            show_progress: true,
        }
    }
}

/// Executes a [`RunPlan`] and collects every sample
pub struct RunCoordinator {
    runners: BTreeMap<String, VariantRunner>,
    monitor: ResourceMonitor,
    show_progress: bool,
    /// Variants whose toolchain was found missing, with the error text
    unavailable: HashMap<String, String>,
}

impl RunCoordinator {
    pub fn new(runners: BTreeMap<String, VariantRunner>, config: ExecutionConfig) -> Self {
        Self {
            runners,
            monitor: ResourceMonitor::new(config.sampling_interval, config.monitor_resources),
            show_progress: config.show_progress,
            unavailable: HashMap::new(),
        }
    }

    /// Record `variant` as unable to run; its iterations fail without being attempted
    pub fn mark_unavailable(&mut self, variant: impl Into<String>, reason: impl Into<String>) {
        self.unavailable.insert(variant.into(), reason.into());
    }

    /// Run the whole plan; always returns the full matrix of samples
    pub fn execute(&mut self, plan: &RunPlan) -> SampleSet {
        let pb = if self.show_progress {
            ProgressBar::new(plan.total_executions() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut samples = SampleSet::new();
        for test in &plan.tests {
            info!("Running test: {}", test.name);
            for (variant, source) in &test.sources {
                pb.set_message(format!("{} / {}", test.name, variant));
                let produced = self.execute_pair(test, variant, source, &pb);
                log_pair_summary(variant, &produced, test.iterations);
                for sample in produced {
                    push_sample(&mut samples, sample);
                }
            }
        }

        pb.finish_with_message("Complete");
        samples
    }

    /// All iterations of one (test, variant) pair
    fn execute_pair(
        &mut self,
        test: &PlannedTest,
        variant: &str,
        source: &std::path::Path,
        pb: &ProgressBar,
    ) -> Vec<RawSample> {
        let iterations = test.iterations;

        if let Some(error) = self.unavailable.get(variant) {
            pb.inc(iterations as u64);
            return fill_failed(
                &test.name,
                variant,
                iterations,
                FailureKind::ToolchainUnavailable,
                error,
            );
        }

        let Some(runner) = self.runners.get_mut(variant) else {
            pb.inc(iterations as u64);
            return fill_failed(
                &test.name,
                variant,
                iterations,
                FailureKind::ToolchainUnavailable,
                &format!("No runner configured for variant '{}'", variant),
            );
        };

        let prepared = match runner.prepare(source) {
            Ok(prepared) => prepared,
            Err(e) => {
                pb.inc(iterations as u64);
                return self.prepare_failed(&test.name, variant, iterations, e);
            }
        };

        let timeout = test
            .timeouts
            .get(variant)
            .copied()
            .unwrap_or(Duration::from_secs(120));
        let runner = &self.runners[variant];

        let mut produced = Vec::with_capacity(iterations as usize);
        for iteration in 0..iterations {
            let sample = runner.run(
                &prepared,
                test.input.as_deref(),
                &test.name,
                iteration,
                timeout,
                &self.monitor,
            );
            if let Some(error) = &sample.error {
                debug!("{} / {} #{} failed: {}", test.name, variant, iteration, error);
            }
            produced.push(sample);
            pb.inc(1);
        }
        produced
    }

    fn prepare_failed(
        &mut self,
        test: &str,
        variant: &str,
        iterations: u32,
        error: PrepareError,
    ) -> Vec<RawSample> {
        let kind = error.failure_kind();
        let diagnostic = error.diagnostic();
        match kind {
            FailureKind::ToolchainUnavailable => {
                warn!("{}: {}; skipping this variant for the rest of the run", variant, diagnostic);
                self.unavailable.insert(variant.to_string(), diagnostic.clone());
            }
            _ => warn!("{} / {}: {}", test, variant, diagnostic.lines().next().unwrap_or("")),
        }
        fill_failed(test, variant, iterations, kind, &diagnostic)
    }
}

/// One failed sample per iteration
fn fill_failed(
    test: &str,
    variant: &str,
    iterations: u32,
    kind: FailureKind,
    error: &str,
) -> Vec<RawSample> {
    (0..iterations)
        .map(|iteration| {
            RawSample::failed(
                test,
                variant,
                iteration,
                kind.clone(),
                error,
                SampleOutcome::default(),
            )
        })
        .collect()
}

fn log_pair_summary(variant: &str, samples: &[RawSample], iterations: u32) {
    let successes: Vec<f64> = samples
        .iter()
        .filter(|s| s.success)
        .map(|s| s.duration_secs())
        .collect();
    if successes.is_empty() {
        info!("  {}: (0/{} success)", variant, iterations);
    } else {
        let avg_ms = successes.iter().sum::<f64>() / successes.len() as f64 * 1000.0;
        info!(
            "  {}: ({}/{} success, avg {:.2} ms)",
            variant,
            successes.len(),
            iterations,
            avg_ms
        );
    }
}
