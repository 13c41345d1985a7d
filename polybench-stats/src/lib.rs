#![warn(missing_docs)]
//! Polybench Statistical Engine
//!
//! Numeric routines used to aggregate repeated process measurements:
//! - Descriptive summaries with sample standard deviation
//! - Percentile calculation by linear interpolation
//! - Welch two-sample t-statistic with an approximate two-sided p-value
//!
//! Every routine degrades to zeroed output on empty input instead of failing.

mod percentiles;
mod significance;
mod summary;

pub use percentiles::compute_percentile;
pub use significance::{
    SignificanceError, WelchTest, approximate_t_cdf, normal_cdf, p_value_or_default, welch_t_test,
};
pub use summary::{SummaryStatistics, compute_summary, positive_values};

/// Degrees of freedom at which the t distribution is replaced by the standard
/// normal. Degrees of freedom are one less than the smaller sample, so that
/// sample needs at least 31 points.
pub const NORMAL_APPROXIMATION_THRESHOLD: usize = 30;

/// p-value reported for pairs without enough samples to compare
pub const NO_EVIDENCE_P_VALUE: f64 = 1.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(NORMAL_APPROXIMATION_THRESHOLD, 30);
        assert!((NO_EVIDENCE_P_VALUE - 1.0).abs() < f64::EPSILON);
    }
}
