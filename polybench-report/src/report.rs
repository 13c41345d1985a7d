//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete outcome of one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identification and host details
    pub meta: RunMeta,
    /// Analysis per test name
    pub tests: BTreeMap<String, TestAnalysis>,
    /// Rankings across all tests
    pub overall: OverallRanking,
    /// Success and failure counts
    pub totals: RunTotals,
}

/// Run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    /// Identifier of the form `bench_YYYYMMDD_HHMMSS`
    pub benchmark_id: String,
    /// Polybench version that produced the run
    pub version: String,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    /// Wall time of the whole run, builds included
    pub total_duration_secs: f64,
    /// Tests in the plan
    pub total_tests: usize,
    /// Variants in the plan
    pub total_variants: usize,
    /// Planned process executions over all tests, variants and iterations
    pub total_executions: usize,
    /// Detected version string per variant
    pub tool_versions: BTreeMap<String, String>,
    /// Host the run executed on
    pub system: SystemInfo,
}

/// System information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model, "Unknown" when not reported
    pub cpu: String,
    /// Logical cores available
    pub cpu_cores: u32,
    /// Total RAM in GiB
    pub memory_gb: f64,
}

/// Aggregate over every sample of one (test, variant) pair
///
/// Time and memory statistics only consider successful samples; memory and
/// CPU figures additionally ignore readings of zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantPerformance {
    /// Test name
    pub test: String,
    /// Variant name
    pub variant: String,
    /// Mean duration in seconds
    pub avg_time_secs: f64,
    /// Shortest duration
    pub min_time_secs: f64,
    /// Longest duration
    pub max_time_secs: f64,
    /// Sample standard deviation, 0 below two successes
    pub std_time_secs: f64,
    /// Median duration
    pub median_time_secs: f64,
    /// Mean peak RSS over measured samples
    pub avg_memory_bytes: f64,
    /// Largest peak RSS
    pub peak_memory_bytes: u64,
    /// Smallest peak RSS
    pub min_memory_bytes: u64,
    /// Mean CPU utilisation in percent of one core
    pub avg_cpu_percent: f64,
    /// Highest per-sample CPU utilisation
    pub max_cpu_percent: f64,
    /// successful ÷ total, 0 when nothing ran
    pub success_rate: f64,
    /// Samples recorded, failures included
    pub total_iterations: usize,
    /// Samples that succeeded
    pub successful_iterations: usize,
    /// Samples that failed
    pub failed_iterations: usize,
    /// Weighted speed/memory/reliability composite, higher is better
    pub performance_score: f64,
    /// Completion and consistency in [0, 1]
    pub reliability_score: f64,
}

impl VariantPerformance {
    /// Whether at least one iteration succeeded
    pub fn has_successes(&self) -> bool {
        self.successful_iterations > 0
    }
}

/// A variant and the score it was ranked by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVariant {
    /// Variant name
    pub variant: String,
    /// Score the ranking is ordered by
    pub score: f64,
}

impl RankedVariant {
    /// Pair a variant name with its score
    pub fn new(variant: impl Into<String>, score: f64) -> Self {
        Self {
            variant: variant.into(),
            score,
        }
    }
}

/// Per-test comparison of every variant that ran
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestAnalysis {
    /// Test name
    pub test: String,
    /// Aggregate per variant name
    pub variants: BTreeMap<String, VariantPerformance>,
    /// Lowest mean time among variants with a success
    pub fastest: Option<String>,
    /// Lowest mean memory among variants with a success
    pub most_memory_efficient: Option<String>,
    /// Highest success rate among all variants
    pub most_reliable: Option<String>,
    /// Variants with a success, best composite score first
    pub performance_ranking: Vec<RankedVariant>,
    /// `significance[a][b]` is the approximate p-value that `a` and `b`
    /// have the same mean duration; 1.0 when either lacks two successes
    pub significance: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Cross-test rankings, each sorted best first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallRanking {
    /// Averaged speed scores
    pub by_speed: Vec<RankedVariant>,
    /// Averaged memory scores
    pub by_memory: Vec<RankedVariant>,
    /// Averaged reliability scores
    pub by_reliability: Vec<RankedVariant>,
    /// Averaged composite scores
    pub by_overall: Vec<RankedVariant>,
    /// Top of each test's performance ranking
    pub category_winners: BTreeMap<String, String>,
}

/// Totals over every sample of the run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    /// Successful samples
    pub total_successful: usize,
    /// Failed samples
    pub total_failed: usize,
    /// successful ÷ all samples, 0 for an empty run
    pub overall_success_rate: f64,
    /// Tests with at least one sample
    pub tests_analyzed: usize,
    /// Distinct variants with at least one sample
    pub variants_tested: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_successes() {
        let mut perf = VariantPerformance::default();
        assert!(!perf.has_successes());
        perf.successful_iterations = 1;
        assert!(perf.has_successes());
    }

    #[test]
    fn test_ranked_variant_serializes_flat() {
        let json = serde_json::to_string(&RankedVariant::new("go", 1.5)).unwrap();
        assert_eq!(json, r#"{"variant":"go","score":1.5}"#);
    }
}
