//! Summary Statistics
//!
//! Descriptive statistics over one set of measurements:
//! - Mean, median and sample standard deviation (n - 1 denominator)
//! - Minimum and maximum
//!
//! An empty input yields a zeroed summary; a single point has zero deviation.

use crate::percentiles::compute_percentile;

/// Descriptive statistics for one sample set
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Middle value (mean of the two middle values for even counts)
    pub median: f64,
    /// Sample standard deviation, 0 when fewer than two points
    pub std_dev: f64,
    /// Smallest observation
    pub min: f64,
    /// Largest observation
    pub max: f64,
    /// Number of observations
    pub sample_count: usize,
}

/// Compute summary statistics for `samples`
pub fn compute_summary(samples: &[f64]) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics::default();
    }

    let n = samples.len();
    let mean = samples.iter().sum::<f64>() / n as f64;

    let std_dev = if n < 2 {
        0.0
    } else {
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };

    let min = samples
        .iter()
        .cloned()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0.0);
    let max = samples
        .iter()
        .cloned()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0.0);

    SummaryStatistics {
        mean,
        median: compute_percentile(samples, 50.0),
        std_dev,
        min,
        max,
        sample_count: n,
    }
}

/// Keep only strictly positive readings.
///
/// Resource readings of zero mean "not measured" and must not drag averages down.
pub fn positive_values(samples: impl IntoIterator<Item = f64>) -> Vec<f64> {
    samples.into_iter().filter(|v| *v > 0.0).collect()
}

impl SummaryStatistics {
    /// Sample variance
    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    /// Coefficient of variation in percent
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_summary() {
        let summary = compute_summary(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert!((summary.mean - 3.0).abs() < 1e-12);
        assert!((summary.median - 3.0).abs() < 1e-12);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.sample_count, 5);
        // sqrt(10 / 4)
        assert!((summary.std_dev - 1.581_138_830_084_189_8).abs() < 1e-12);
    }

    #[test]
    fn test_single_point_has_no_deviation() {
        let summary = compute_summary(&[0.25]);
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.min, 0.25);
        assert_eq!(summary.max, 0.25);
        assert_eq!(summary.median, 0.25);
    }

    #[test]
    fn test_ordering_invariant() {
        let sets: [&[f64]; 4] = [
            &[0.3, 0.1, 0.2],
            &[5.0, 5.0, 5.0, 5.0],
            &[1.0, 100.0],
            &[0.001, 0.5, 0.002, 0.003, 0.9, 0.1],
        ];
        for set in sets {
            let s = compute_summary(set);
            assert!(s.min <= s.median && s.median <= s.max, "{:?}", s);
            assert!(s.min <= s.mean && s.mean <= s.max, "{:?}", s);
        }
    }

    #[test]
    fn test_empty_samples() {
        let summary = compute_summary(&[]);
        assert_eq!(summary, SummaryStatistics::default());
        assert_eq!(summary.coefficient_of_variation(), 0.0);
    }

    #[test]
    fn test_positive_values() {
        let kept = positive_values([0.0, 12.0, 0.0, 3.5]);
        assert_eq!(kept, vec![12.0, 3.5]);
    }

    #[test]
    fn test_variance() {
        let summary = compute_summary(&[2.0, 4.0]);
        assert!((summary.variance() - 2.0).abs() < 1e-12);
    }
}
