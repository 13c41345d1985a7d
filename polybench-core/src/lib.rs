#![warn(missing_docs)]
//! Polybench Core - Sample Model
//!
//! Types shared by the execution engine and the statistical compiler:
//! - `RawSample`, the immutable record of one timed process execution
//! - `FailureKind`, the failure taxonomy carried on unsuccessful samples
//! - `Timer` and `Deadline` for wall-clock supervision of external processes

mod measure;
mod sample;

pub use measure::{Deadline, Timer};
pub use sample::{FailureKind, RawSample, SampleOutcome};

use std::collections::BTreeMap;

/// Samples keyed by test name, then by variant name
pub type SampleSet = BTreeMap<String, BTreeMap<String, Vec<RawSample>>>;

/// Insert `sample` into `set` under its test and variant, keeping arrival order
pub fn push_sample(set: &mut SampleSet, sample: RawSample) {
    set.entry(sample.test.clone())
        .or_default()
        .entry(sample.variant.clone())
        .or_default()
        .push(sample);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_push_sample_groups_by_test_and_variant() {
        let mut set = SampleSet::new();
        for (test, variant, iteration) in [("sort", "rust", 0), ("sort", "go", 0), ("sort", "rust", 1)] {
            push_sample(
                &mut set,
                RawSample::succeeded(
                    test,
                    variant,
                    iteration,
                    SampleOutcome {
                        duration: Duration::from_millis(5),
                        ..Default::default()
                    },
                ),
            );
        }

        let sort = &set["sort"];
        assert_eq!(sort.len(), 2);
        assert_eq!(sort["rust"].len(), 2);
        assert_eq!(sort["rust"][1].iteration, 1);
    }
}
