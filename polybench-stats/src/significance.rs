//! Two-Sample Significance
//!
//! Welch's t-statistic between two duration samples, converted to a two-sided
//! p-value with an approximate Student-t CDF:
//! - `df >= 30`: standard normal CDF
//! - `df < 30`: the closed form `0.5 + t / (2 * sqrt(df + t^2))`
//!
//! Degrees of freedom are `min(n1, n2) - 1` rather than Welch-Satterthwaite.
//! The result is a coarse screening signal, not a reference-grade test.

use crate::NORMAL_APPROXIMATION_THRESHOLD;
use crate::summary::compute_summary;

/// Outcome of a two-sample comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchTest {
    /// Absolute t-statistic
    pub t_statistic: f64,
    /// Degrees of freedom used for the CDF lookup
    pub degrees_of_freedom: usize,
    /// Approximate two-sided p-value in [0, 1]
    pub p_value: f64,
}

/// Errors from significance testing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignificanceError {
    /// First sample has fewer than two points
    #[error("First sample needs at least 2 points, got {0}")]
    InsufficientFirst(usize),
    /// Second sample has fewer than two points
    #[error("Second sample needs at least 2 points, got {0}")]
    InsufficientSecond(usize),
}

/// Run the approximate Welch test on two samples
pub fn welch_t_test(first: &[f64], second: &[f64]) -> Result<WelchTest, SignificanceError> {
    if first.len() < 2 {
        return Err(SignificanceError::InsufficientFirst(first.len()));
    }
    if second.len() < 2 {
        return Err(SignificanceError::InsufficientSecond(second.len()));
    }

    let a = compute_summary(first);
    let b = compute_summary(second);
    let n1 = first.len() as f64;
    let n2 = second.len() as f64;

    let standard_error = (a.variance() / n1 + b.variance() / n2).sqrt();
    let t_statistic = if standard_error > 0.0 {
        (a.mean - b.mean).abs() / standard_error
    } else {
        0.0
    };

    let degrees_of_freedom = first.len().min(second.len()) - 1;
    let p_value = (2.0 * (1.0 - approximate_t_cdf(t_statistic, degrees_of_freedom))).clamp(0.0, 1.0);

    Ok(WelchTest {
        t_statistic,
        degrees_of_freedom,
        p_value,
    })
}

/// p-value of [`welch_t_test`], or 1.0 (no evidence of a difference) when
/// either sample is too small
pub fn p_value_or_default(first: &[f64], second: &[f64]) -> f64 {
    welch_t_test(first, second)
        .map(|test| test.p_value)
        .unwrap_or(crate::NO_EVIDENCE_P_VALUE)
}

/// Approximate CDF of Student's t distribution at `t`
pub fn approximate_t_cdf(t: f64, df: usize) -> f64 {
    if df >= NORMAL_APPROXIMATION_THRESHOLD {
        normal_cdf(t)
    } else {
        let df = df as f64;
        (0.5 + t / (2.0 * (df + t * t).sqrt())).clamp(0.0, 1.0)
    }
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function approximation
fn erf(x: f64) -> f64 {
    // Abramowitz and Stegun 7.1.26
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples() {
        let samples = [0.010, 0.011, 0.009, 0.010];
        let result = welch_t_test(&samples, &samples).unwrap();
        assert_eq!(result.t_statistic, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_is_not_significant() {
        let result = welch_t_test(&[0.01, 0.01, 0.01], &[0.02, 0.02, 0.02]).unwrap();
        assert_eq!(result.t_statistic, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clear_difference_small_sample() {
        let fast = [0.100, 0.102, 0.098, 0.101, 0.099];
        let slow = [0.200, 0.202, 0.198, 0.201, 0.199];
        let result = welch_t_test(&fast, &slow).unwrap();

        assert_eq!(result.degrees_of_freedom, 4);
        assert!(result.t_statistic > 50.0);
        // closed form never reaches zero but gets close for large t
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn test_large_sample_uses_normal() {
        let a: Vec<f64> = (0..40).map(|i| 1.0 + (i % 5) as f64 * 0.01).collect();
        let b: Vec<f64> = (0..40).map(|i| 2.0 + (i % 5) as f64 * 0.01).collect();
        let result = welch_t_test(&a, &b).unwrap();

        assert_eq!(result.degrees_of_freedom, 39);
        assert!(result.p_value < 1e-6);
    }

    #[test]
    fn test_normal_threshold_counts_degrees_of_freedom() {
        let a: Vec<f64> = (0..30).map(|i| 1.0 + (i % 3) as f64 * 0.1).collect();
        let b: Vec<f64> = (0..30).map(|i| 1.05 + (i % 3) as f64 * 0.1).collect();
        assert_eq!(welch_t_test(&a, &b).unwrap().degrees_of_freedom, 29);

        // 30 points each still takes the closed form
        assert!(approximate_t_cdf(1.0, 29) < 0.6);
        assert_eq!(
            approximate_t_cdf(1.0, NORMAL_APPROXIMATION_THRESHOLD),
            normal_cdf(1.0)
        );
    }

    #[test]
    fn test_symmetry() {
        let a = [1.0, 1.2, 0.9, 1.1];
        let b = [1.3, 1.5, 1.4];
        let ab = welch_t_test(&a, &b).unwrap();
        let ba = welch_t_test(&b, &a).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_insufficient_samples() {
        assert_eq!(
            welch_t_test(&[1.0], &[1.0, 2.0]),
            Err(SignificanceError::InsufficientFirst(1))
        );
        assert_eq!(
            welch_t_test(&[1.0, 2.0], &[]),
            Err(SignificanceError::InsufficientSecond(0))
        );
        assert_eq!(p_value_or_default(&[1.0], &[1.0, 2.0]), 1.0);
    }

    #[test]
    fn test_approximate_cdf_bounds() {
        assert!((approximate_t_cdf(0.0, 5) - 0.5).abs() < 1e-12);
        assert!((approximate_t_cdf(0.0, 50) - 0.5).abs() < 1e-6);
        assert!(approximate_t_cdf(1000.0, 3) <= 1.0);
        assert!(approximate_t_cdf(-1000.0, 3) >= 0.0);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }
}
