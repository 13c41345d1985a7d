//! Statistical Compiler
//!
//! Turns the sample matrix into per-test analyses and cross-test rankings.
//! Compilation is a pure function of its input: compiling the same samples
//! twice gives identical results.
//!
//! Per (test, variant):
//! - Duration statistics over successful iterations only
//! - Memory and CPU statistics over readings greater than zero (zero means
//!   the sampler never observed the process)
//! - Composite performance score and reliability score
//!
//! Per test: winners, a ranking by performance score and pairwise p-values.
//! Across tests: average per-variant scores, ranked descending.

use polybench_core::{RawSample, SampleSet};
use polybench_report::{OverallRanking, RankedVariant, RunTotals, TestAnalysis, VariantPerformance};
use polybench_stats::{compute_summary, p_value_or_default, positive_values};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Weights of the composite performance score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub time: f64,
    pub memory: f64,
    pub reliability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            time: 0.7,
            memory: 0.2,
            reliability: 0.1,
        }
    }
}

/// Everything derived from one sample set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledResults {
    pub tests: BTreeMap<String, TestAnalysis>,
    pub overall: OverallRanking,
    pub totals: RunTotals,
}

/// Aggregates raw samples into analyses and rankings
#[derive(Debug, Clone, Default)]
pub struct StatisticalCompiler {
    weights: ScoreWeights,
}

impl StatisticalCompiler {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Compile every test in `samples` (tests are analysed in parallel)
    pub fn compile(&self, samples: &SampleSet) -> CompiledResults {
        let tests: BTreeMap<String, TestAnalysis> = samples
            .par_iter()
            .map(|(test, by_variant)| (test.clone(), self.analyze_test(test, by_variant)))
            .collect();

        let overall = self.overall_ranking(&tests);
        let totals = run_totals(samples, tests.len());

        CompiledResults {
            tests,
            overall,
            totals,
        }
    }

    /// Analysis of one test across its variants
    pub fn analyze_test(&self, test: &str, by_variant: &BTreeMap<String, Vec<RawSample>>) -> TestAnalysis {
        let variants: BTreeMap<String, VariantPerformance> = by_variant
            .iter()
            .map(|(variant, samples)| {
                (
                    variant.clone(),
                    self.variant_performance(test, variant, samples),
                )
            })
            .collect();

        let fastest = min_among_successful(&variants, |p| p.avg_time_secs);
        let most_memory_efficient = min_among_successful(&variants, |p| p.avg_memory_bytes);
        let most_reliable = most_reliable(&variants);

        let mut performance_ranking: Vec<RankedVariant> = variants
            .values()
            .filter(|p| p.has_successes())
            .map(|p| RankedVariant::new(p.variant.clone(), p.performance_score))
            .collect();
        sort_descending(&mut performance_ranking);

        TestAnalysis {
            test: test.to_string(),
            variants,
            fastest,
            most_memory_efficient,
            most_reliable,
            performance_ranking,
            significance: significance_matrix(by_variant),
        }
    }

    /// Aggregate one (test, variant) pair
    pub fn variant_performance(&self, test: &str, variant: &str, samples: &[RawSample]) -> VariantPerformance {
        let total_iterations = samples.len();
        let successful: Vec<&RawSample> = samples.iter().filter(|s| s.success).collect();
        let successful_iterations = successful.len();

        let mut perf = VariantPerformance {
            test: test.to_string(),
            variant: variant.to_string(),
            total_iterations,
            successful_iterations,
            failed_iterations: total_iterations - successful_iterations,
            success_rate: if total_iterations > 0 {
                successful_iterations as f64 / total_iterations as f64
            } else {
                0.0
            },
            ..Default::default()
        };

        if successful.is_empty() {
            return perf;
        }

        let durations: Vec<f64> = successful.iter().map(|s| s.duration_secs()).collect();
        let time = compute_summary(&durations);
        perf.avg_time_secs = time.mean;
        perf.min_time_secs = time.min;
        perf.max_time_secs = time.max;
        perf.std_time_secs = time.std_dev;
        perf.median_time_secs = time.median;

        let memory = compute_summary(&positive_values(
            successful.iter().map(|s| s.peak_memory_bytes as f64),
        ));
        perf.avg_memory_bytes = memory.mean;
        perf.peak_memory_bytes = memory.max as u64;
        perf.min_memory_bytes = memory.min as u64;

        let cpu = compute_summary(&positive_values(successful.iter().map(|s| s.avg_cpu_percent)));
        perf.avg_cpu_percent = cpu.mean;
        perf.max_cpu_percent = cpu.max;

        perf.performance_score = self.performance_score(&perf);
        perf.reliability_score = reliability_score(perf.success_rate, perf.std_time_secs);
        perf
    }

    /// Weighted composite of speed, memory and reliability terms; 0 without successes
    pub fn performance_score(&self, perf: &VariantPerformance) -> f64 {
        if !perf.has_successes() || perf.avg_time_secs <= 0.0 {
            return 0.0;
        }
        speed_score(perf.avg_time_secs) * self.weights.time
            + memory_score(perf.avg_memory_bytes) * self.weights.memory
            + perf.success_rate * 100.0 * self.weights.reliability
    }

    fn overall_ranking(&self, tests: &BTreeMap<String, TestAnalysis>) -> OverallRanking {
        let mut speed: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut memory: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut reliability: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut overall: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

        for analysis in tests.values() {
            for perf in analysis.variants.values().filter(|p| p.has_successes()) {
                let variant = perf.variant.as_str();
                let speed_term = if perf.avg_time_secs > 0.0 {
                    speed_score(perf.avg_time_secs)
                } else {
                    0.0
                };
                speed.entry(variant).or_default().push(speed_term);
                memory
                    .entry(variant)
                    .or_default()
                    .push(memory_score(perf.avg_memory_bytes));
                reliability
                    .entry(variant)
                    .or_default()
                    .push(perf.reliability_score * 100.0);
                overall
                    .entry(variant)
                    .or_default()
                    .push(perf.performance_score);
            }
        }

        let category_winners = tests
            .iter()
            .filter_map(|(test, analysis)| {
                analysis
                    .performance_ranking
                    .first()
                    .map(|top| (test.clone(), top.variant.clone()))
            })
            .collect();

        OverallRanking {
            by_speed: average_ranking(&speed),
            by_memory: average_ranking(&memory),
            by_reliability: average_ranking(&reliability),
            by_overall: average_ranking(&overall),
            category_winners,
        }
    }
}

/// Completion plus consistency; 0 when nothing succeeded
pub fn reliability_score(success_rate: f64, std_time_secs: f64) -> f64 {
    if success_rate <= 0.0 {
        return 0.0;
    }
    let consistency = 1.0 / (1.0 + std_time_secs);
    0.8 * success_rate + 0.2 * consistency
}

/// Reciprocal of the mean duration in milliseconds, scaled by 1000
fn speed_score(avg_time_secs: f64) -> f64 {
    1000.0 / (avg_time_secs * 1000.0)
}

/// Reciprocal of mean memory in MiB (floored at 1), scaled by 100
fn memory_score(avg_memory_bytes: f64) -> f64 {
    100.0 / (avg_memory_bytes / 1024.0 / 1024.0).max(1.0)
}

fn min_among_successful(
    variants: &BTreeMap<String, VariantPerformance>,
    key: impl Fn(&VariantPerformance) -> f64,
) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for perf in variants.values().filter(|p| p.has_successes()) {
        let value = key(perf);
        if best.map_or(true, |(_, current)| value < current) {
            best = Some((perf.variant.as_str(), value));
        }
    }
    best.map(|(name, _)| name.to_string())
}

fn most_reliable(variants: &BTreeMap<String, VariantPerformance>) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for perf in variants.values() {
        if best.map_or(true, |(_, current)| perf.success_rate > current) {
            best = Some((perf.variant.as_str(), perf.success_rate));
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// p-value for every ordered pair of distinct variants
fn significance_matrix(
    by_variant: &BTreeMap<String, Vec<RawSample>>,
) -> BTreeMap<String, BTreeMap<String, f64>> {
    let durations: BTreeMap<&str, Vec<f64>> = by_variant
        .iter()
        .map(|(variant, samples)| {
            (
                variant.as_str(),
                samples
                    .iter()
                    .filter(|s| s.success)
                    .map(|s| s.duration_secs())
                    .collect(),
            )
        })
        .collect();

    durations
        .iter()
        .map(|(first, first_times)| {
            let row = durations
                .iter()
                .filter(|(second, _)| second != &first)
                .map(|(second, second_times)| {
                    (second.to_string(), p_value_or_default(first_times, second_times))
                })
                .collect();
            (first.to_string(), row)
        })
        .collect()
}

fn average_ranking(scores: &BTreeMap<&str, Vec<f64>>) -> Vec<RankedVariant> {
    let mut ranking: Vec<RankedVariant> = scores
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(variant, values)| {
            RankedVariant::new(*variant, values.iter().sum::<f64>() / values.len() as f64)
        })
        .collect();
    sort_descending(&mut ranking);
    ranking
}

fn sort_descending(ranking: &mut [RankedVariant]) {
    ranking.sort_by(|a, b| b.score.total_cmp(&a.score));
}

fn run_totals(samples: &SampleSet, tests_analyzed: usize) -> RunTotals {
    let mut total_successful = 0;
    let mut total_failed = 0;
    let mut variants: Vec<&str> = Vec::new();

    for by_variant in samples.values() {
        for (variant, runs) in by_variant {
            if !variants.contains(&variant.as_str()) {
                variants.push(variant);
            }
            let ok = runs.iter().filter(|s| s.success).count();
            total_successful += ok;
            total_failed += runs.len() - ok;
        }
    }

    let total = total_successful + total_failed;
    RunTotals {
        total_successful,
        total_failed,
        overall_success_rate: if total > 0 {
            total_successful as f64 / total as f64
        } else {
            0.0
        },
        tests_analyzed,
        variants_tested: variants.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polybench_core::{push_sample, FailureKind, SampleOutcome};
    use std::time::Duration;

    fn ok(test: &str, variant: &str, iteration: u32, millis: u64, memory: u64) -> RawSample {
        RawSample::succeeded(
            test,
            variant,
            iteration,
            SampleOutcome {
                duration: Duration::from_millis(millis),
                peak_memory_bytes: memory,
                avg_cpu_percent: if memory > 0 { 50.0 } else { 0.0 },
                ..Default::default()
            },
        )
    }

    fn failed(test: &str, variant: &str, iteration: u32) -> RawSample {
        RawSample::failed(
            test,
            variant,
            iteration,
            FailureKind::NonZeroExit { code: Some(1) },
            "boom",
            SampleOutcome::default(),
        )
    }

    fn ranking_scenario() -> SampleSet {
        let mut set = SampleSet::new();
        for i in 0..3 {
            push_sample(&mut set, ok("sort", "a", i, 10, 4 * 1024 * 1024));
        }
        push_sample(&mut set, ok("sort", "b", 0, 5, 8 * 1024 * 1024));
        push_sample(&mut set, ok("sort", "b", 1, 5, 8 * 1024 * 1024));
        push_sample(&mut set, failed("sort", "b", 2));
        set
    }

    #[test]
    fn test_reliability_and_speed_rank_independently() {
        let results = StatisticalCompiler::default().compile(&ranking_scenario());
        let sort = &results.tests["sort"];

        assert_eq!(sort.most_reliable.as_deref(), Some("a"));
        assert_eq!(sort.fastest.as_deref(), Some("b"));
        assert_eq!(sort.most_memory_efficient.as_deref(), Some("a"));

        let b = &sort.variants["b"];
        assert_eq!(b.successful_iterations, 2);
        assert_eq!(b.failed_iterations, 1);
        assert!((b.success_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!((b.avg_time_secs - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_scores() {
        let results = StatisticalCompiler::default().compile(&ranking_scenario());
        let a = &results.tests["sort"].variants["a"];

        // 1000 / 10ms = 100; 100 / 4 MiB = 25; 100% reliability
        let expected = 100.0 * 0.7 + 25.0 * 0.2 + 100.0 * 0.1;
        assert!((a.performance_score - expected).abs() < 1e-9);
        assert!(a.std_time_secs < 1e-12);
        assert!((a.reliability_score - 1.0).abs() < 1e-9);

        let b = &results.tests["sort"].variants["b"];
        let expected_b = 200.0 * 0.7 + 12.5 * 0.2 + (2.0 / 3.0) * 100.0 * 0.1;
        assert!((b.performance_score - expected_b).abs() < 1e-9);

        let ranking: Vec<&str> = results.tests["sort"]
            .performance_ranking
            .iter()
            .map(|r| r.variant.as_str())
            .collect();
        assert_eq!(ranking, vec!["b", "a"]);
        assert_eq!(results.overall.category_winners["sort"], "b");
    }

    #[test]
    fn test_all_failed_variant() {
        let mut set = ranking_scenario();
        for i in 0..3 {
            push_sample(&mut set, failed("sort", "c", i));
        }
        let results = StatisticalCompiler::default().compile(&set);
        let sort = &results.tests["sort"];
        let c = &sort.variants["c"];

        assert_eq!(c.performance_score, 0.0);
        assert_eq!(c.reliability_score, 0.0);
        assert_eq!(c.avg_time_secs, 0.0);
        assert_eq!(c.successful_iterations + c.failed_iterations, c.total_iterations);
        assert_ne!(sort.fastest.as_deref(), Some("c"));
        assert_ne!(sort.most_memory_efficient.as_deref(), Some("c"));
        assert!(sort.performance_ranking.iter().all(|r| r.variant != "c"));
        assert!(results.overall.by_speed.iter().all(|r| r.variant != "c"));
        assert!(results.overall.by_overall.iter().all(|r| r.variant != "c"));
    }

    #[test]
    fn test_no_successes_means_no_winner() {
        let mut set = SampleSet::new();
        push_sample(&mut set, failed("t", "x", 0));
        push_sample(&mut set, failed("t", "y", 0));
        let results = StatisticalCompiler::default().compile(&set);
        let t = &results.tests["t"];

        assert!(t.fastest.is_none());
        assert!(t.most_memory_efficient.is_none());
        assert_eq!(t.most_reliable.as_deref(), Some("x"));
        assert!(t.performance_ranking.is_empty());
        assert!(results.overall.category_winners.is_empty());
        assert!(results.overall.by_overall.is_empty());
        assert_eq!(results.totals.total_failed, 2);
        assert_eq!(results.totals.overall_success_rate, 0.0);
    }

    #[test]
    fn test_zero_resource_readings_are_not_measured() {
        let mut set = SampleSet::new();
        push_sample(&mut set, ok("t", "v", 0, 10, 0));
        push_sample(&mut set, ok("t", "v", 1, 10, 2048));
        push_sample(&mut set, ok("t", "v", 2, 10, 4096));
        let perf = &StatisticalCompiler::default().compile(&set).tests["t"].variants["v"];

        assert_eq!(perf.avg_memory_bytes, 3072.0);
        assert_eq!(perf.min_memory_bytes, 2048);
        assert_eq!(perf.peak_memory_bytes, 4096);
        assert_eq!(perf.avg_cpu_percent, 50.0);
    }

    #[test]
    fn test_duration_ordering_invariants() {
        let mut set = SampleSet::new();
        for (i, ms) in [12u64, 3, 40, 7, 7, 25].iter().enumerate() {
            push_sample(&mut set, ok("t", "v", i as u32, *ms, 0));
        }
        let perf = &StatisticalCompiler::default().compile(&set).tests["t"].variants["v"];
        assert!(perf.min_time_secs <= perf.median_time_secs);
        assert!(perf.median_time_secs <= perf.max_time_secs);
        assert!(perf.min_time_secs <= perf.avg_time_secs);
        assert!(perf.avg_time_secs <= perf.max_time_secs);
    }

    #[test]
    fn test_significance_matrix() {
        let mut set = SampleSet::new();
        for (i, ms) in [10u64, 11, 12, 10, 11].iter().enumerate() {
            push_sample(&mut set, ok("t", "slow", i as u32, ms * 10, 0));
            push_sample(&mut set, ok("t", "fast", i as u32, *ms, 0));
        }
        push_sample(&mut set, ok("t", "single", 0, 10, 0));
        let sig = &StatisticalCompiler::default().compile(&set).tests["t"].significance;

        assert_eq!(sig.len(), 3);
        assert_eq!(sig["fast"].len(), 2);
        assert!(!sig["fast"].contains_key("fast"));
        assert!(sig["fast"]["slow"] < 0.05);
        assert_eq!(sig["fast"]["slow"], sig["slow"]["fast"]);
        assert_eq!(sig["single"]["fast"], 1.0);
        assert_eq!(sig["slow"]["single"], 1.0);
    }

    #[test]
    fn test_overall_ranking_averages_over_successful_tests() {
        let mut set = ranking_scenario();
        for i in 0..2 {
            push_sample(&mut set, ok("search", "a", i, 20, 0));
            push_sample(&mut set, failed("search", "b", i));
        }
        let results = StatisticalCompiler::default().compile(&set);

        let speed: BTreeMap<&str, f64> = results
            .overall
            .by_speed
            .iter()
            .map(|r| (r.variant.as_str(), r.score))
            .collect();
        // a: mean of 100 (10ms) and 50 (20ms); b: only "sort" counts
        assert!((speed["a"] - 75.0).abs() < 1e-9);
        assert!((speed["b"] - 200.0).abs() < 1e-9);
        assert_eq!(results.overall.by_speed[0].variant, "b");

        assert_eq!(results.totals.tests_analyzed, 2);
        assert_eq!(results.totals.variants_tested, 2);
        assert_eq!(results.totals.total_successful, 7);
        assert_eq!(results.totals.total_failed, 3);
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let set = ranking_scenario();
        let compiler = StatisticalCompiler::default();
        let first = compiler.compile(&set);
        let second = compiler.compile(&set);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        let results = StatisticalCompiler::default().compile(&SampleSet::new());
        assert!(results.tests.is_empty());
        assert_eq!(results.totals, RunTotals::default());
        assert_eq!(results.overall, OverallRanking::default());
    }
}
