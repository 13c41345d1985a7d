//! Output Formatting
//!
//! Human-readable output for a run summary:
//! - One section per test with per-variant timing, memory and success counts
//! - Status icons (✓ every iteration passed, ~ some failed, ✗ none passed)
//! - Winners per test and the cross-test rankings

use polybench_report::{format_bytes, format_secs, RankedVariant, RunSummary, VariantPerformance};

/// Format a run summary for terminal display
pub fn format_human_output(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Polybench Results\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "Run: {}  ({} tests, {} variants, {} executions, {:.2}s)\n\n",
        summary.meta.benchmark_id,
        summary.meta.total_tests,
        summary.meta.total_variants,
        summary.meta.total_executions,
        summary.meta.total_duration_secs
    ));

    for (test, analysis) in &summary.tests {
        output.push_str(&format!("Test: {}\n", test));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for perf in analysis.variants.values() {
            format_variant(&mut output, perf);
        }

        output.push_str(&format!(
            "  fastest: {}  lowest memory: {}  most reliable: {}\n\n",
            analysis.fastest.as_deref().unwrap_or("none"),
            analysis.most_memory_efficient.as_deref().unwrap_or("none"),
            analysis.most_reliable.as_deref().unwrap_or("none"),
        ));
    }

    if !summary.overall.by_overall.is_empty() {
        output.push_str("Overall Rankings\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        format_ranking(&mut output, "overall", &summary.overall.by_overall);
        format_ranking(&mut output, "speed", &summary.overall.by_speed);
        format_ranking(&mut output, "memory", &summary.overall.by_memory);
        format_ranking(&mut output, "reliability", &summary.overall.by_reliability);
        output.push('\n');
    }

    let totals = &summary.totals;
    output.push_str(&format!(
        "Summary: {} succeeded, {} failed ({:.1}% success)\n",
        totals.total_successful,
        totals.total_failed,
        totals.overall_success_rate * 100.0
    ));

    output
}

fn format_variant(output: &mut String, perf: &VariantPerformance) {
    let icon = if perf.successful_iterations == 0 {
        "✗"
    } else if perf.failed_iterations > 0 {
        "~"
    } else {
        "✓"
    };
    output.push_str(&format!(
        "  {} {:<12} {}/{} ok\n",
        icon, perf.variant, perf.successful_iterations, perf.total_iterations
    ));

    if !perf.has_successes() {
        return;
    }

    output.push_str(&format!(
        "      mean: {}  median: {}  stddev: {}\n",
        format_secs(perf.avg_time_secs),
        format_secs(perf.median_time_secs),
        format_secs(perf.std_time_secs)
    ));
    output.push_str(&format!(
        "      min: {}  max: {}\n",
        format_secs(perf.min_time_secs),
        format_secs(perf.max_time_secs)
    ));
    if perf.peak_memory_bytes > 0 {
        output.push_str(&format!(
            "      memory: avg {}  peak {}  cpu: avg {:.1}%  max {:.1}%\n",
            format_bytes(perf.avg_memory_bytes),
            format_bytes(perf.peak_memory_bytes as f64),
            perf.avg_cpu_percent,
            perf.max_cpu_percent
        ));
    }
    output.push_str(&format!(
        "      score: {:.2}  reliability: {:.3}\n",
        perf.performance_score, perf.reliability_score
    ));
}

fn format_ranking(output: &mut String, label: &str, ranking: &[RankedVariant]) {
    let entries: Vec<String> = ranking
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {} ({:.2})", i + 1, r.variant, r.score))
        .collect();
    output.push_str(&format!("  {:<12} {}\n", format!("{}:", label), entries.join("  ")));
}
